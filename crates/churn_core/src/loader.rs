//! Delimited record source loading
//!
//! Reads a headed CSV source into an untyped string table. Header names are
//! trimmed; cell contents are left untouched for the cleaner.

use crate::errors::{ChurnError, Result};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Untyped table as read from a delimited source
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Load a CSV file with a header row
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading raw records from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load CSV content from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();

        if headers.iter().all(|header| header.is_empty()) {
            return Err(ChurnError::Dataset("source has no header row".into()));
        }

        let mut seen = HashSet::with_capacity(headers.len());
        if let Some(duplicate) = headers.iter().find(|header| !seen.insert(header.as_str())) {
            return Err(ChurnError::Dataset(format!(
                "duplicate column header: {duplicate}"
            )));
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(ChurnError::Dataset("source has no data rows".into()));
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_csv_trims_headers() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, " customerID ,tenure, Contract")?;
        writeln!(file, "0001,5,\"Month-to-month\"")?;
        writeln!(file, "0002,60,Two year")?;
        file.flush()?;

        let table = RawTable::from_csv_path(file.path())?;
        assert_eq!(table.headers, vec!["customerID", "tenure", "Contract"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2], "Month-to-month");
        Ok(())
    }

    #[test]
    fn test_rejects_header_only_source() {
        let err = RawTable::from_reader("a,b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ChurnError::Dataset(_)));
    }

    #[test]
    fn test_rejects_duplicate_headers() {
        let err = RawTable::from_reader("tenure, tenure,Churn\n1,100,Yes\n2,200,No\n".as_bytes())
            .unwrap_err();
        match err {
            ChurnError::Dataset(message) => assert!(message.contains("tenure")),
            other => panic!("expected dataset error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = RawTable::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ChurnError::Csv(_)));
    }
}
