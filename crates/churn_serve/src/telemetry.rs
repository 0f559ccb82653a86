//! Prediction service metrics

use metrics::describe_counter;

pub const PREDICTIONS_TOTAL: &str = "churn_predictions_total";
pub const PREDICTION_ERRORS_TOTAL: &str = "churn_prediction_errors_total";
pub const VALIDATION_REJECTIONS_TOTAL: &str = "churn_validation_rejections_total";

/// Register descriptions with the installed recorder
pub fn describe() {
    describe_counter!(PREDICTIONS_TOTAL, "Records scored by the prediction endpoint");
    describe_counter!(
        PREDICTION_ERRORS_TOTAL,
        "Prediction requests that failed after validation"
    );
    describe_counter!(
        VALIDATION_REJECTIONS_TOTAL,
        "Prediction batches rejected by field validation"
    );
    describe_counter!(
        churn_core::RECONCILE_FALLBACK_COUNTER,
        "Batches scored without column reconciliation because the expected layout was unavailable"
    );
}
