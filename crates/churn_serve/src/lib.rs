//! Churn prediction service
//!
//! HTTP surface over a trained churn pipeline. The pipeline is loaded once
//! behind a readiness gate; requests that arrive earlier get a 503.

pub mod readiness;
pub mod server;
pub mod telemetry;

pub use readiness::PipelineHandle;
pub use server::{bind_listener, build_router, AppState, PredictionRequest, SharedState};
