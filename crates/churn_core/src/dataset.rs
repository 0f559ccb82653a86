//! Labeled training dataset

use crate::record::{Frame, Record};

/// Feature frame plus a parallel binary label sequence (1 = churn)
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub features: Frame,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn new(features: Frame, labels: Vec<u8>) -> Self {
        debug_assert_eq!(features.len(), labels.len());
        Self { features, labels }
    }

    /// Build from records; the frame takes the union of their fields
    pub fn from_records(records: &[Record], labels: Vec<u8>) -> Self {
        Self::new(Frame::from_records(records), labels)
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_names(&self) -> &[String] {
        self.features.columns()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let rows = indices
            .iter()
            .map(|&idx| self.features.rows()[idx].clone())
            .collect();
        let labels = indices.iter().map(|&idx| self.labels[idx]).collect();
        Dataset {
            features: Frame::new(self.features.columns().to_vec(), rows),
            labels,
        }
    }

    /// Share of positive labels
    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        let positives = self.labels.iter().filter(|&&label| label == 1).count();
        positives as f64 / self.labels.len() as f64
    }
}
