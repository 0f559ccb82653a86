//! Churn Trainer - deterministic offline churn pipeline trainer
//!
//! Fits the column transform and logistic-regression scorer on the Telco
//! churn source, either end-to-end or as separate preprocess/train stages.

pub mod deterministic;
pub mod errors;
pub mod evaluation;
pub mod stages;

pub use deterministic::{stratified_split, HoldoutSplit, LcgRng};
pub use errors::TrainerError;
pub use evaluation::{accuracy, roc_auc, Evaluation};
pub use stages::{fit, preprocess, train, PreprocessReport, TrainReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
