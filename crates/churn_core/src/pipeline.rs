//! Trained pipeline: fitted transform plus fitted scorer, persisted as one unit

use crate::artifact::{load_artifact, save_artifact};
use crate::dataset::Dataset;
use crate::errors::{ChurnError, Result};
use crate::matrix::NumericMatrix;
use crate::reconcile::reconcile;
use crate::record::{Frame, Record};
use crate::schema::infer_schema;
use crate::scorer::{to_label, LogisticRegression, Scorer};
use crate::transform::{ColumnTransformPipeline, FittedTransform};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

/// Artifact layout version
pub const FORMAT_VERSION: u32 = 1;

/// Descriptive metadata stored with the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub format_version: u32,
    /// Unix seconds
    pub created_at: i64,
    pub output_width: usize,
    pub training_rows: usize,
    /// Digest of the raw training source, empty when unknown
    #[serde(default)]
    pub training_data_hash: String,
    pub feature_names: Vec<String>,
    pub scorer: String,
}

/// Per-record churn probabilities and their thresholded labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub probabilities: Vec<f64>,
    /// 1 = churn, 0 = no churn
    pub predictions: Vec<u8>,
}

impl Predictions {
    fn from_probabilities(probabilities: Vec<f64>) -> Self {
        let predictions = probabilities.iter().copied().map(to_label).collect();
        Self {
            probabilities,
            predictions,
        }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Fitted transform and scorer with a shared lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPipeline<S = LogisticRegression> {
    pub metadata: PipelineMetadata,
    pub transform: FittedTransform,
    pub scorer: S,
}

impl<S: Scorer> TrainedPipeline<S> {
    /// Infer the schema, fit the transform, then fit `scorer` on the result
    #[instrument(skip(dataset, scorer), fields(rows = dataset.len()))]
    pub fn fit(dataset: &Dataset, mut scorer: S) -> Result<Self> {
        let schema = infer_schema(&dataset.features)?;
        let mut transform = ColumnTransformPipeline::new();
        let matrix = transform.fit(&dataset.features, &schema)?;
        scorer.fit(&matrix, &dataset.labels)?;

        let state = transform
            .into_state()
            .ok_or_else(|| ChurnError::ColumnMismatch("transform lost its fitted state".into()))?;
        Ok(Self::from_parts(state, scorer, dataset.len()))
    }

    /// Combine an already fitted transform and scorer
    pub fn from_parts(transform: FittedTransform, scorer: S, training_rows: usize) -> Self {
        let metadata = PipelineMetadata {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            output_width: transform.output_width(),
            training_rows,
            training_data_hash: String::new(),
            feature_names: transform.feature_names(),
            scorer: scorer.name().to_string(),
        };
        Self {
            metadata,
            transform,
            scorer,
        }
    }

    pub fn with_training_data_hash(mut self, hash: impl Into<String>) -> Self {
        self.metadata.training_data_hash = hash.into();
        self
    }

    /// Replay the transform only
    pub fn transform_records(&self, records: &[Record]) -> NumericMatrix {
        self.transform.transform_records(records)
    }

    /// Reconcile, replay and score a batch of records
    pub fn predict_records(&self, records: &[Record]) -> Result<Predictions> {
        let (frame, _) = reconcile(Frame::from_records(records), &self.transform);
        self.predict_frame(&frame)
    }

    /// Replay and score a frame as-is
    pub fn predict_frame(&self, frame: &Frame) -> Result<Predictions> {
        let matrix = self.transform.transform_frame(frame);
        let probabilities = self.scorer.predict_proba(&matrix)?;
        Ok(Predictions::from_probabilities(probabilities))
    }
}

impl<S> TrainedPipeline<S>
where
    S: Serialize + for<'de> Deserialize<'de>,
{
    /// Persist as a single artifact; returns its digest
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        save_artifact(self, path)
    }

    /// Load a whole pipeline; the transform and scorer come back together or not at all
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let pipeline: Self = load_artifact(path.as_ref())?;
        if pipeline.metadata.format_version != FORMAT_VERSION {
            return Err(ChurnError::ArtifactIntegrity(format!(
                "unsupported format version {}",
                pipeline.metadata.format_version
            )));
        }
        info!(
            "Loaded pipeline from {} ({} inputs -> {} features, trained on {} rows)",
            path.as_ref().display(),
            pipeline.transform.schema.len(),
            pipeline.metadata.output_width,
            pipeline.metadata.training_rows
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let records = vec![
            Record::new().with("tenure", 1.0).with("Contract", "Month-to-month"),
            Record::new().with("tenure", 3.0).with("Contract", "Month-to-month"),
            Record::new().with("tenure", 48.0).with("Contract", "Two year"),
            Record::new().with("tenure", 70.0).with("Contract", "Two year"),
        ];
        Dataset::from_records(&records, vec![1, 1, 0, 0])
    }

    #[test]
    fn test_fit_records_metadata() {
        let pipeline = TrainedPipeline::fit(&dataset(), LogisticRegression::default()).unwrap();
        assert_eq!(pipeline.metadata.output_width, 3);
        assert_eq!(pipeline.metadata.training_rows, 4);
        assert_eq!(pipeline.metadata.scorer, "logistic_regression");
        assert_eq!(pipeline.metadata.feature_names.len(), 3);
    }

    #[test]
    fn test_predictions_follow_input_order() {
        let pipeline = TrainedPipeline::fit(&dataset(), LogisticRegression::default()).unwrap();
        let out = pipeline
            .predict_records(&[
                Record::new().with("tenure", 2.0).with("Contract", "Month-to-month"),
                Record::new().with("tenure", 65.0).with("Contract", "Two year"),
            ])
            .unwrap();
        assert_eq!(out.predictions, vec![1, 0]);
        assert!(out.probabilities[0] > out.probabilities[1]);
    }

    #[test]
    fn test_empty_feature_set_fails_fit() {
        let data = Dataset::from_records(&[Record::new()], vec![1]);
        let err = TrainedPipeline::fit(&data, LogisticRegression::default()).unwrap_err();
        assert!(matches!(err, ChurnError::Schema(_)));
    }
}
