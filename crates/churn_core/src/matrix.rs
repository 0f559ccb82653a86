//! Fixed-width numeric matrix

use crate::errors::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix; every row has exactly `width` values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericMatrix {
    width: usize,
    n_rows: usize,
    data: Vec<f64>,
}

impl NumericMatrix {
    pub fn with_capacity(width: usize, rows: usize) -> Self {
        Self {
            width,
            n_rows: 0,
            data: Vec::with_capacity(width * rows),
        }
    }

    /// Build from nested rows; ragged input is a schema error
    pub fn from_rows(width: usize, rows: Vec<Vec<f64>>) -> Result<Self> {
        let mut matrix = Self::with_capacity(width, rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ChurnError::Schema(format!(
                    "row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    width
                )));
            }
            matrix.push_row(row);
        }
        Ok(matrix)
    }

    pub(crate) fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width);
        self.data.extend_from_slice(row);
        self.n_rows += 1;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.width;
        &self.data[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |idx| self.row(idx))
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.data.len() != self.width * self.n_rows {
            return Err(ChurnError::Schema(format!(
                "matrix holds {} values, expected {} x {}",
                self.data.len(),
                self.n_rows,
                self.width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_round_trip_through_json() {
        let matrix = NumericMatrix::from_rows(2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(matrix.row(1), &[3.0, 4.0]);

        let json = serde_json::to_string(&matrix).unwrap();
        let restored: NumericMatrix = serde_json::from_str(&json).unwrap();
        restored.validate().unwrap();
        assert_eq!(restored, matrix);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = NumericMatrix::from_rows(2, vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, ChurnError::Schema(_)));
    }
}
