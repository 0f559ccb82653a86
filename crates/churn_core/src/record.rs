//! Customer records and tabular frames
//!
//! A [`Record`] is an unordered mapping from feature name to value; the
//! field set may differ between records. A [`Frame`] is the tabular view
//! used for fitting and for serving paths that work column-wise.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

pub(crate) static MISSING: FieldValue = FieldValue::Missing;

/// One cell of customer data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl FieldValue {
    /// Interpret a raw delimited-file cell: blank is missing, a finite
    /// number is numeric, anything else is categorical text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Missing;
        }
        match parse_finite(trimmed) {
            Some(number) => FieldValue::Number(number),
            None => FieldValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, FieldValue::Number(value) if value.is_finite())
    }

    /// Numeric view of the value. Text that parses as a finite number is
    /// accepted; everything else (including non-finite numbers) is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) if value.is_finite() => Some(*value),
            FieldValue::Text(text) => parse_finite(text.trim()),
            _ => None,
        }
    }

    /// Categorical view of the value. Numbers are rendered with their
    /// shortest decimal form so `1`, `1.0` and `"1"` share one category.
    pub fn as_category(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
            FieldValue::Number(value) if value.is_finite() => {
                Some(Cow::Owned(format_number(*value)))
            }
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Render a number the way it is keyed in a categorical vocabulary
pub fn format_number(value: f64) -> String {
    // -0.0 and 0.0 must share a key
    (value + 0.0).to_string()
}

/// One customer's feature values. Field order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Value for `name`, absent fields read as missing
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&MISSING)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Row-major table with named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl Frame {
    /// Build a frame from rows. Every row must have one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<FieldValue>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    /// Union of all record fields in first-seen order; absent cells are missing.
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for record in records {
            for (name, _) in record.iter() {
                if !index.contains_key(name) {
                    index.insert(name.to_string(), columns.len());
                    columns.push(name.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).clone())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterate the cells of one column, top to bottom
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &FieldValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Append a column whose every cell is missing
    pub fn add_missing_column(&mut self, name: impl Into<String>) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(FieldValue::Missing);
        }
    }

    /// Remove a column by position, returning its cells
    pub fn remove_column(&mut self, index: usize) -> Vec<FieldValue> {
        self.columns.remove(index);
        self.rows.iter_mut().map(|row| row.remove(index)).collect()
    }

    /// Apply `f` to every cell of one column
    pub fn map_column<F>(&mut self, index: usize, mut f: F)
    where
        F: FnMut(FieldValue) -> FieldValue,
    {
        for row in &mut self.rows {
            let value = std::mem::take(&mut row[index]);
            row[index] = f(value);
        }
    }

    /// New frame holding exactly `columns`, in that order. Unknown names
    /// produce all-missing columns.
    pub fn select(&self, columns: &[String]) -> Frame {
        let positions: Vec<Option<usize>> =
            columns.iter().map(|name| self.column_index(name)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|position| position.map(|idx| row[idx].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Frame {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Row `index` as a record; missing cells are left out
    pub fn record(&self, index: usize) -> Record {
        self.columns
            .iter()
            .zip(&self.rows[index])
            .filter(|(_, value)| !value.is_missing())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn to_records(&self) -> Vec<Record> {
        (0..self.rows.len()).map(|idx| self.record(idx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cells_are_typed() {
        assert_eq!(FieldValue::from_raw("  "), FieldValue::Missing);
        assert_eq!(FieldValue::from_raw(" 29.85 "), FieldValue::Number(29.85));
        assert_eq!(FieldValue::from_raw("Yes "), FieldValue::Text("Yes".into()));
        // non-finite spellings stay categorical
        assert_eq!(FieldValue::from_raw("nan"), FieldValue::Text("nan".into()));
    }

    #[test]
    fn test_numbers_and_numeric_text_share_a_category() {
        assert_eq!(FieldValue::Number(1.0).as_category().as_deref(), Some("1"));
        assert_eq!(FieldValue::Text("1".into()).as_category().as_deref(), Some("1"));
        assert_eq!(FieldValue::Number(-0.0).as_category().as_deref(), Some("0"));
        assert_eq!(FieldValue::Missing.as_category(), None);
    }

    #[test]
    fn test_json_null_and_absent_fields_are_missing() {
        let record: Record =
            serde_json::from_str(r#"{"tenure": null, "Contract": "One year", "x": 3}"#).unwrap();
        assert!(record.get("tenure").is_missing());
        assert!(record.get("absent").is_missing());
        assert_eq!(record.get("x"), &FieldValue::Number(3.0));
        assert_eq!(record.get("Contract"), &FieldValue::Text("One year".into()));
    }

    #[test]
    fn test_frame_from_records_takes_union_of_fields() {
        let records = vec![
            Record::new().with("a", 1.0),
            Record::new().with("b", "x").with("a", 2.0),
        ];
        let frame = Frame::from_records(&records);
        assert_eq!(frame.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(frame.rows()[0][1], FieldValue::Missing);
        assert_eq!(frame.record(1), records[1]);
    }

    #[test]
    fn test_select_reorders_and_fills() {
        let frame = Frame::from_records(&[Record::new().with("a", 1.0).with("b", "x")]);
        let selected = frame.select(&["b".to_string(), "c".to_string()]);
        assert_eq!(selected.columns(), &["b".to_string(), "c".to_string()]);
        assert_eq!(
            selected.rows()[0],
            vec![FieldValue::Text("x".into()), FieldValue::Missing]
        );
    }
}
