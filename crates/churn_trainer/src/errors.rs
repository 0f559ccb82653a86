use churn_core::ChurnError;
use thiserror::Error;

/// Errors returned by the churn trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Core(#[from] ChurnError),

    #[error("invalid holdout split: {0}")]
    InvalidSplit(String),

    #[error("training error: {0}")]
    Training(String),
}
