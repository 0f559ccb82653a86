//! Inference-time column reconciliation
//!
//! Bridges an incoming frame to the exact input layout the fitted transform
//! expects: missing columns are added as all-missing, extra columns dropped,
//! and the remainder reordered. When the expected layout cannot be
//! determined the frame is passed through unchanged and the event is logged
//! and counted; any misalignment then surfaces at prediction time.

use crate::record::Frame;
use tracing::{debug, warn};

/// Counter incremented every time reconciliation falls back to pass-through
pub const RECONCILE_FALLBACK_COUNTER: &str = "churn_reconcile_fallback_total";

/// Source of the expected input column list
pub trait ExpectedColumns {
    /// Expected input columns in order, or `None` when they cannot be determined
    fn expected_columns(&self) -> Option<Vec<String>>;
}

impl ExpectedColumns for crate::transform::ColumnTransformPipeline {
    fn expected_columns(&self) -> Option<Vec<String>> {
        crate::transform::ColumnTransformPipeline::expected_columns(self)
    }
}

impl ExpectedColumns for crate::transform::FittedTransform {
    fn expected_columns(&self) -> Option<Vec<String>> {
        Some(crate::transform::FittedTransform::expected_columns(self))
    }
}

/// What reconciliation did to a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Frame now has exactly the expected columns
    Aligned {
        added: Vec<String>,
        dropped: Vec<String>,
    },
    /// Expected layout unknown; frame left as received
    PassThrough,
}

impl Reconciliation {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Reconciliation::PassThrough)
    }
}

/// Align `frame` to the layout reported by `source`
pub fn reconcile<S>(frame: Frame, source: &S) -> (Frame, Reconciliation)
where
    S: ExpectedColumns + ?Sized,
{
    match source.expected_columns() {
        Some(expected) => align(frame, &expected),
        None => {
            warn!(
                columns = ?frame.columns(),
                "expected input columns unavailable; passing frame through unreconciled"
            );
            metrics::counter!(RECONCILE_FALLBACK_COUNTER).increment(1);
            (frame, Reconciliation::PassThrough)
        }
    }
}

/// Align `frame` to an explicit expected column list
pub fn align(mut frame: Frame, expected: &[String]) -> (Frame, Reconciliation) {
    let added: Vec<String> = expected
        .iter()
        .filter(|name| frame.column_index(name).is_none())
        .cloned()
        .collect();
    let dropped: Vec<String> = frame
        .columns()
        .iter()
        .filter(|name| !expected.contains(name))
        .cloned()
        .collect();

    for name in &added {
        frame.add_missing_column(name.clone());
    }

    let aligned = frame.select(expected);
    if !added.is_empty() || !dropped.is_empty() {
        debug!(?added, ?dropped, "reconciled inference frame");
    }

    (aligned, Reconciliation::Aligned { added, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Record};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    struct Unknown;

    struct Known;

    impl ExpectedColumns for Known {
        fn expected_columns(&self) -> Option<Vec<String>> {
            Some(expected())
        }
    }

    impl ExpectedColumns for Unknown {
        fn expected_columns(&self) -> Option<Vec<String>> {
            None
        }
    }

    fn expected() -> Vec<String> {
        vec!["tenure".into(), "MonthlyCharges".into(), "Contract".into()]
    }

    #[test]
    fn test_align_adds_drops_and_reorders() {
        let frame = Frame::from_records(&[Record::new()
            .with("Contract", "Two year")
            .with("tenure", 60.0)
            .with("favourite_colour", "green")]);

        let (aligned, outcome) = align(frame, &expected());
        assert_eq!(aligned.columns(), expected().as_slice());
        assert_eq!(
            aligned.rows()[0],
            vec![
                FieldValue::Number(60.0),
                FieldValue::Missing,
                FieldValue::Text("Two year".into())
            ]
        );
        assert_eq!(
            outcome,
            Reconciliation::Aligned {
                added: vec!["MonthlyCharges".into()],
                dropped: vec!["favourite_colour".into()],
            }
        );
    }

    #[test]
    fn test_align_empty_batch_keeps_layout() {
        let (aligned, _) = align(Frame::from_records(&[]), &expected());
        assert_eq!(aligned.columns(), expected().as_slice());
        assert!(aligned.is_empty());
    }

    #[test]
    fn test_unknown_layout_passes_through() {
        let frame = Frame::from_records(&[Record::new().with("b", 1.0).with("a", 2.0)]);
        let (out, outcome) = reconcile(frame.clone(), &Unknown);
        assert!(outcome.is_fallback());
        assert_eq!(out, frame);
    }

    #[test]
    fn test_unfitted_pipeline_passes_through() {
        let pipeline = crate::transform::ColumnTransformPipeline::new();
        let frame = Frame::from_records(&[Record::new().with("a", 2.0)]);
        let (_, outcome) = reconcile(frame, &pipeline);
        assert_eq!(outcome, Reconciliation::PassThrough);
    }

    #[test]
    fn test_only_fallback_is_counted() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let frame = Frame::from_records(&[Record::new().with("a", 2.0)]);

        metrics::with_local_recorder(&recorder, || {
            let (_, outcome) = reconcile(frame.clone(), &Known);
            assert!(!outcome.is_fallback());
            let (_, outcome) = reconcile(frame, &Unknown);
            assert!(outcome.is_fallback());
        });

        let counted: Vec<u64> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == RECONCILE_FALLBACK_COUNTER)
            .filter_map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => Some(count),
                _ => None,
            })
            .collect();
        assert_eq!(counted, vec![1]);
    }
}
