//! Churn prediction core
//!
//! Data model, cleaning, schema inference, the fit/replay column transform,
//! inference-time reconciliation, the scorer contract and the persisted
//! trained pipeline shared by the training and serving binaries.

pub mod artifact;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod loader;
pub mod matrix;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod schema;
pub mod scorer;
pub mod transform;
pub mod upstream;
pub mod validation;

pub use artifact::{canonical_json_string, file_digest, load_artifact, save_artifact};
pub use cleaner::{clean, CleanOptions, LABEL_COLUMN};
pub use config::ChurnConfig;
pub use dataset::Dataset;
pub use errors::{ChurnError, FieldViolation, Result};
pub use loader::RawTable;
pub use matrix::NumericMatrix;
pub use pipeline::{PipelineMetadata, Predictions, TrainedPipeline, FORMAT_VERSION};
pub use reconcile::{align, reconcile, ExpectedColumns, Reconciliation, RECONCILE_FALLBACK_COUNTER};
pub use record::{FieldValue, Frame, Record};
pub use schema::{infer_schema, FeatureSchema};
pub use scorer::{to_label, LogisticParams, LogisticRegression, Scorer, DECISION_THRESHOLD};
pub use transform::{
    CategoricalColumnState, ColumnTransformPipeline, FittedTransform, NumericColumnState,
};
pub use upstream::{wait_for_all, wait_for_file, WaitPolicy};
pub use validation::{validate_batch, validate_record, FieldKind, CUSTOMER_FIELDS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
