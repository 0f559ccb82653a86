//! Raw table cleaning
//!
//! Turns an untyped [`RawTable`] into a typed [`Dataset`]: identifier columns
//! are dropped, known numeric-as-text columns are coerced, every cell is
//! trimmed and typed, and the label column is split off and binarized.

use crate::dataset::Dataset;
use crate::errors::{ChurnError, Result};
use crate::loader::RawTable;
use crate::record::{FieldValue, Frame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fixed label column of the churn dataset
pub const LABEL_COLUMN: &str = "Churn";

/// Cleaning rules applied to a raw table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanOptions {
    pub label_column: String,
    /// Columns removed before fitting (not predictive)
    pub identifier_columns: Vec<String>,
    /// Columns coerced to numeric; unparsable cells become missing
    pub numeric_columns: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            label_column: LABEL_COLUMN.to_string(),
            identifier_columns: vec!["customerID".to_string()],
            numeric_columns: vec!["TotalCharges".to_string()],
        }
    }
}

/// Clean a raw table into a labeled dataset
pub fn clean(table: &RawTable, options: &CleanOptions) -> Result<Dataset> {
    let label_idx = table
        .headers
        .iter()
        .position(|header| header == &options.label_column)
        .ok_or_else(|| {
            ChurnError::Schema(format!(
                "target column '{}' not found",
                options.label_column
            ))
        })?;

    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| FieldValue::from_raw(cell)).collect())
        .collect();
    let mut frame = Frame::new(table.headers.clone(), rows);

    let mut labels = Vec::with_capacity(table.len());
    for (row, value) in frame.remove_column(label_idx).into_iter().enumerate() {
        labels.push(parse_label(row, &value)?);
    }

    for column in &options.numeric_columns {
        if let Some(idx) = frame.column_index(column) {
            let mut coerced = 0usize;
            frame.map_column(idx, |value| match value {
                FieldValue::Text(_) => {
                    coerced += 1;
                    FieldValue::Missing
                }
                other => other,
            });
            if coerced > 0 {
                debug!("Coerced {} non-numeric cell(s) in '{}' to missing", coerced, column);
            }
        }
    }

    for column in &options.identifier_columns {
        if let Some(idx) = frame.column_index(column) {
            frame.remove_column(idx);
        }
    }

    let dataset = Dataset::new(frame, labels);
    info!(
        "Cleaned dataset: {} rows, {} feature columns, churn rate {:.3}",
        dataset.len(),
        dataset.feature_names().len(),
        dataset.positive_rate()
    );
    Ok(dataset)
}

fn parse_label(row: usize, value: &FieldValue) -> Result<u8> {
    let label = match value {
        FieldValue::Text(text) => match text.to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Some(1),
            "no" | "false" | "0" => Some(0),
            _ => None,
        },
        FieldValue::Number(number) if *number == 1.0 => Some(1),
        FieldValue::Number(number) if *number == 0.0 => Some(0),
        _ => None,
    };

    label.ok_or_else(|| ChurnError::InvalidLabel {
        row,
        value: match value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Missing => String::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_clean_drops_identifier_and_splits_label() {
        let raw = table(
            "customerID,tenure,Contract,TotalCharges,Churn\n\
             A-1,5, Month-to-month ,29.85,Yes\n\
             A-2,60,Two year, ,No\n",
        );
        let dataset = clean(&raw, &CleanOptions::default()).unwrap();

        assert_eq!(dataset.feature_names(), &["tenure", "Contract", "TotalCharges"]);
        assert_eq!(dataset.labels, vec![1, 0]);
        let first = dataset.features.record(0);
        assert_eq!(first.get("Contract"), &FieldValue::Text("Month-to-month".into()));
        assert_eq!(first.get("TotalCharges"), &FieldValue::Number(29.85));
        assert!(dataset.features.record(1).get("TotalCharges").is_missing());
    }

    #[test]
    fn test_clean_coerces_text_in_numeric_columns() {
        let raw = table("TotalCharges,Churn\nabc,No\n10,Yes\n");
        let dataset = clean(&raw, &CleanOptions::default()).unwrap();
        assert!(dataset.features.record(0).get("TotalCharges").is_missing());
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let raw = table("tenure,Contract\n5,Two year\n");
        let err = clean(&raw, &CleanOptions::default()).unwrap_err();
        assert!(matches!(err, ChurnError::Schema(_)));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let raw = table("tenure,Churn\n5,Maybe\n");
        let err = clean(&raw, &CleanOptions::default()).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidLabel { row: 0, .. }));
    }
}
