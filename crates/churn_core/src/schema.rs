//! Feature schema inference
//!
//! Partitions the feature columns of a cleaned dataset into numeric and
//! categorical lists. A column is numeric only when every present cell is
//! numeric; any textual cell makes the whole column categorical.

use crate::errors::{ChurnError, Result};
use crate::record::{FieldValue, Frame};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed partition of feature names, decided once at fit time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

impl FeatureSchema {
    /// Input columns in transform order: numeric first, then categorical
    pub fn expected_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(&self.categorical_columns)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.numeric_columns.len() + self.categorical_columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Infer the schema of a feature frame (label already removed)
pub fn infer_schema(features: &Frame) -> Result<FeatureSchema> {
    if features.columns().is_empty() {
        return Err(ChurnError::Schema("feature set is empty".into()));
    }

    let mut schema = FeatureSchema::default();
    for (idx, name) in features.columns().iter().enumerate() {
        let numeric = features
            .column_values(idx)
            .all(|value| matches!(value, FieldValue::Missing) || value.is_number());

        if numeric {
            schema.numeric_columns.push(name.clone());
        } else {
            schema.categorical_columns.push(name.clone());
        }
    }

    debug!(
        "Inferred schema: {} numeric {:?}, {} categorical {:?}",
        schema.numeric_columns.len(),
        schema.numeric_columns,
        schema.categorical_columns.len(),
        schema.categorical_columns
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    #[test]
    fn test_partitions_in_column_order() {
        let frame = Frame::from_records(&[
            Record::new()
                .with("gender", "Female")
                .with("tenure", 5.0)
                .with("Contract", "Two year")
                .with("MonthlyCharges", 29.85),
        ]);
        let schema = infer_schema(&frame).unwrap();
        assert_eq!(schema.numeric_columns, vec!["MonthlyCharges", "tenure"]);
        assert_eq!(schema.categorical_columns, vec!["Contract", "gender"]);
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let frame = Frame::from_records(&[
            Record::new().with("code", 1.0),
            Record::new().with("code", "B7"),
        ]);
        let schema = infer_schema(&frame).unwrap();
        assert!(schema.numeric_columns.is_empty());
        assert_eq!(schema.categorical_columns, vec!["code"]);
    }

    #[test]
    fn test_missing_cells_do_not_decide_type() {
        let frame = Frame::from_records(&[
            Record::new().with("TotalCharges", FieldValue::Missing),
            Record::new().with("TotalCharges", 42.0),
        ]);
        let schema = infer_schema(&frame).unwrap();
        assert_eq!(schema.numeric_columns, vec!["TotalCharges"]);
    }

    #[test]
    fn test_empty_feature_set_fails() {
        let frame = Frame::new(Vec::new(), vec![Vec::new()]);
        assert!(matches!(infer_schema(&frame), Err(ChurnError::Schema(_))));
    }
}
