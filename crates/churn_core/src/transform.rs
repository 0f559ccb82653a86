//! Column transform pipeline
//!
//! Fit mode estimates, per numeric column, a median for imputation and the
//! mean / standard deviation of the *imputed* column for scaling; per
//! categorical column, the most frequent value for imputation and a
//! vocabulary in first-seen order for one-hot encoding.
//!
//! Replay mode applies those statistics to arbitrary records without
//! re-estimating anything. Output layout is fixed by the fitted state:
//! numeric columns in schema order, then one one-hot block per categorical
//! column with positions in vocabulary order. Categories never seen at fit
//! time encode as an all-zero block.

use crate::errors::{ChurnError, Result};
use crate::matrix::NumericMatrix;
use crate::record::{FieldValue, Frame, Record, MISSING};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Fitted statistics of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnState {
    pub name: String,
    /// Imputation value (median of present values)
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation of the imputed column; 0 marks a
    /// constant column whose scaled output is always 0
    pub std_dev: f64,
}

impl NumericColumnState {
    fn fit(name: &str, values: &[&FieldValue]) -> Self {
        let mut present: Vec<f64> = values.iter().filter_map(|value| value.as_number()).collect();

        let median = if present.is_empty() {
            warn!("Numeric column '{}' has no present values; imputing 0", name);
            0.0
        } else {
            present.sort_by(f64::total_cmp);
            let mid = present.len() / 2;
            if present.len() % 2 == 0 {
                (present[mid - 1] + present[mid]) / 2.0
            } else {
                present[mid]
            }
        };

        let imputed: Vec<f64> = values
            .iter()
            .map(|value| value.as_number().unwrap_or(median))
            .collect();

        let n = imputed.len().max(1) as f64;
        let mean = imputed.iter().sum::<f64>() / n;
        let constant = imputed.windows(2).all(|pair| pair[0] == pair[1]);
        let std_dev = if constant {
            0.0
        } else {
            (imputed.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt()
        };

        Self {
            name: name.to_string(),
            median,
            mean,
            std_dev,
        }
    }

    /// Impute then scale one cell
    pub fn apply(&self, value: &FieldValue) -> f64 {
        if self.std_dev == 0.0 {
            return 0.0;
        }
        let x = value.as_number().unwrap_or(self.median);
        (x - self.mean) / self.std_dev
    }
}

/// Fitted vocabulary of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnState {
    pub name: String,
    /// Imputation value (most frequent present category)
    pub most_frequent: String,
    /// Categories in first-seen order after imputation
    pub vocabulary: Vec<String>,
}

impl CategoricalColumnState {
    fn fit(name: &str, values: &[&FieldValue]) -> Result<Self> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in values {
            if let Some(category) = value.as_category() {
                *counts.entry(category.into_owned()).or_default() += 1;
            }
        }

        // highest count wins; ties go to the smallest category
        let most_frequent = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| category.clone())
            .ok_or_else(|| {
                ChurnError::Schema(format!("categorical column '{}' has no values", name))
            })?;

        let mut seen = HashSet::new();
        let mut vocabulary = Vec::new();
        for value in values {
            let category = value
                .as_category()
                .map(|category| category.into_owned())
                .unwrap_or_else(|| most_frequent.clone());
            if seen.insert(category.clone()) {
                vocabulary.push(category);
            }
        }

        Ok(Self {
            name: name.to_string(),
            most_frequent,
            vocabulary,
        })
    }

    fn index(&self) -> HashMap<&str, usize> {
        self.vocabulary
            .iter()
            .enumerate()
            .map(|(idx, category)| (category.as_str(), idx))
            .collect()
    }
}

/// Everything needed to replay the training-time transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    pub schema: FeatureSchema,
    pub numeric: Vec<NumericColumnState>,
    pub categorical: Vec<CategoricalColumnState>,
}

impl FittedTransform {
    /// Output column count; unseen categories add no column
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|column| column.vocabulary.len())
                .sum::<usize>()
    }

    /// Names of the output columns, in output order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.output_width());
        for column in &self.numeric {
            names.push(format!("num__{}", column.name));
        }
        for column in &self.categorical {
            for category in &column.vocabulary {
                names.push(format!("cat__{}_{}", column.name, category));
            }
        }
        names
    }

    /// Input columns the replay path reads, in transform order
    pub fn expected_columns(&self) -> Vec<String> {
        self.schema.expected_columns()
    }

    /// Encode rows; `lookup(row, slot)` yields the cell of input slot
    /// `slot` (numeric columns first, then categorical) for `row`.
    fn encode<'a, F>(&self, n_rows: usize, lookup: F) -> NumericMatrix
    where
        F: Fn(usize, usize) -> &'a FieldValue,
    {
        let width = self.output_width();
        let indexes: Vec<HashMap<&str, usize>> =
            self.categorical.iter().map(|column| column.index()).collect();
        let mut matrix = NumericMatrix::with_capacity(width, n_rows);
        let mut out = vec![0.0; width];

        for row in 0..n_rows {
            out.iter_mut().for_each(|cell| *cell = 0.0);

            for (slot, column) in self.numeric.iter().enumerate() {
                out[slot] = column.apply(lookup(row, slot));
            }

            let mut offset = self.numeric.len();
            for (idx, column) in self.categorical.iter().enumerate() {
                let value = lookup(row, self.numeric.len() + idx);
                let category = value.as_category();
                let key = category.as_deref().unwrap_or(column.most_frequent.as_str());
                if let Some(position) = indexes[idx].get(key) {
                    out[offset + position] = 1.0;
                }
                offset += column.vocabulary.len();
            }

            matrix.push_row(&out);
        }

        matrix
    }

    /// Replay over records with arbitrary field sets
    pub fn transform_records(&self, records: &[Record]) -> NumericMatrix {
        let names = self.expected_columns();
        self.encode(records.len(), move |row, slot| records[row].get(&names[slot]))
    }

    /// Replay over a frame; columns are resolved by name, absent ones read
    /// as missing and extra ones are ignored
    pub fn transform_frame(&self, frame: &Frame) -> NumericMatrix {
        let positions: Vec<Option<usize>> = self
            .expected_columns()
            .iter()
            .map(|name| frame.column_index(name))
            .collect();
        let rows = frame.rows();
        self.encode(frame.len(), move |row, slot| match positions[slot] {
            Some(position) => &rows[row][position],
            None => &MISSING,
        })
    }
}

fn column_cells<'a>(features: &'a Frame, name: &str) -> Result<Vec<&'a FieldValue>> {
    let idx = features
        .column_index(name)
        .ok_or_else(|| ChurnError::Schema(format!("column '{}' missing from fit data", name)))?;
    Ok(features.column_values(idx).collect())
}

/// Two-mode transform: `fit` once, then replay any number of times
#[derive(Debug, Clone, Default)]
pub struct ColumnTransformPipeline {
    state: Option<FittedTransform>,
}

impl ColumnTransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap previously fitted state
    pub fn from_state(state: FittedTransform) -> Self {
        Self { state: Some(state) }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&FittedTransform> {
        self.state.as_ref()
    }

    pub fn into_state(self) -> Option<FittedTransform> {
        self.state
    }

    pub fn output_width(&self) -> Option<usize> {
        self.state.as_ref().map(FittedTransform::output_width)
    }

    /// Input columns of the fitted transform, `None` before fit
    pub fn expected_columns(&self) -> Option<Vec<String>> {
        self.state.as_ref().map(FittedTransform::expected_columns)
    }

    /// Fit on a feature frame and return its encoded matrix
    #[instrument(skip(self, features, schema), fields(rows = features.len()))]
    pub fn fit(&mut self, features: &Frame, schema: &FeatureSchema) -> Result<NumericMatrix> {
        if schema.is_empty() {
            return Err(ChurnError::Schema("feature set is empty".into()));
        }

        let mut numeric = Vec::with_capacity(schema.numeric_columns.len());
        for name in &schema.numeric_columns {
            let state = NumericColumnState::fit(name, &column_cells(features, name)?);
            debug!(
                "num {}: median={} mean={} std={}",
                name, state.median, state.mean, state.std_dev
            );
            numeric.push(state);
        }

        let mut categorical = Vec::with_capacity(schema.categorical_columns.len());
        for name in &schema.categorical_columns {
            let state = CategoricalColumnState::fit(name, &column_cells(features, name)?)?;
            debug!(
                "cat {}: mode={:?} vocabulary={:?}",
                name, state.most_frequent, state.vocabulary
            );
            categorical.push(state);
        }

        let state = FittedTransform {
            schema: schema.clone(),
            numeric,
            categorical,
        };
        let matrix = state.transform_frame(features);
        info!(
            "Fitted column transform: {} input columns -> {} output columns",
            schema.len(),
            state.output_width()
        );
        self.state = Some(state);
        Ok(matrix)
    }

    fn fitted(&self) -> Result<&FittedTransform> {
        self.state.as_ref().ok_or_else(|| {
            ChurnError::ColumnMismatch("transform has not been fitted (call fit first)".into())
        })
    }

    /// Replay over records
    pub fn transform(&self, records: &[Record]) -> Result<NumericMatrix> {
        Ok(self.fitted()?.transform_records(records))
    }

    /// Replay over a frame
    pub fn transform_frame(&self, frame: &Frame) -> Result<NumericMatrix> {
        Ok(self.fitted()?.transform_frame(frame))
    }
}
