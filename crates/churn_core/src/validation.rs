//! Structural validation of inbound customer records
//!
//! Checks only the kind of each known field. Numeric fields also accept
//! numeric text. Absent fields and unknown extra fields are accepted;
//! reconciliation deals with both later.

use crate::errors::{ChurnError, FieldViolation, Result};
use crate::record::{FieldValue, Record};

/// Expected kind of a known customer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer restricted to {0, 1}
    Flag,
    /// Whole number
    Count,
    /// Any finite number
    Amount,
    /// Free categorical text
    Category,
}

/// Known customer fields of the Telco churn dataset
pub const CUSTOMER_FIELDS: &[(&str, FieldKind)] = &[
    ("gender", FieldKind::Category),
    ("SeniorCitizen", FieldKind::Flag),
    ("Partner", FieldKind::Category),
    ("Dependents", FieldKind::Category),
    ("tenure", FieldKind::Count),
    ("PhoneService", FieldKind::Category),
    ("MultipleLines", FieldKind::Category),
    ("InternetService", FieldKind::Category),
    ("OnlineSecurity", FieldKind::Category),
    ("OnlineBackup", FieldKind::Category),
    ("DeviceProtection", FieldKind::Category),
    ("TechSupport", FieldKind::Category),
    ("StreamingTV", FieldKind::Category),
    ("StreamingMovies", FieldKind::Category),
    ("Contract", FieldKind::Category),
    ("PaperlessBilling", FieldKind::Category),
    ("PaymentMethod", FieldKind::Category),
    ("MonthlyCharges", FieldKind::Amount),
    ("TotalCharges", FieldKind::Amount),
];

pub fn field_kind(name: &str) -> Option<FieldKind> {
    CUSTOMER_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
}

fn check(kind: FieldKind, value: &FieldValue) -> std::result::Result<(), String> {
    if value.is_missing() {
        return Ok(());
    }
    match kind {
        FieldKind::Flag => match value.as_number() {
            Some(v) if v == 0.0 || v == 1.0 => Ok(()),
            _ => Err("must be 0 or 1".to_string()),
        },
        FieldKind::Count => match value.as_number() {
            Some(v) if v.fract() == 0.0 => Ok(()),
            _ => Err("must be an integer".to_string()),
        },
        FieldKind::Amount => match value.as_number() {
            Some(_) => Ok(()),
            None => Err("must be a number".to_string()),
        },
        FieldKind::Category => match value {
            FieldValue::Text(_) => Ok(()),
            _ => Err("must be a string".to_string()),
        },
    }
}

/// Violations found in one record at batch position `index`
pub fn validate_record(index: usize, record: &Record) -> Vec<FieldViolation> {
    record
        .iter()
        .filter_map(|(name, value)| {
            let kind = field_kind(name)?;
            check(kind, value).err().map(|message| FieldViolation {
                record: index,
                field: name.to_string(),
                message,
            })
        })
        .collect()
}

/// Validate every record; any violation rejects the whole batch
pub fn validate_batch(records: &[Record]) -> Result<()> {
    let violations: Vec<FieldViolation> = records
        .iter()
        .enumerate()
        .flat_map(|(index, record)| validate_record(index, record))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ChurnError::Validation(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_and_sparse_records_pass() {
        let records = vec![
            Record::new()
                .with("SeniorCitizen", 1.0)
                .with("tenure", 12.0)
                .with("Contract", "Two year")
                .with("MonthlyCharges", 49.95),
            Record::new(),
            Record::new().with("loyalty_tier", "gold"),
        ];
        assert!(validate_batch(&records).is_ok());
    }

    #[test]
    fn test_senior_citizen_flag_is_restricted() {
        let violations = validate_record(3, &Record::new().with("SeniorCitizen", 2.0));
        assert_eq!(
            violations,
            vec![FieldViolation {
                record: 3,
                field: "SeniorCitizen".into(),
                message: "must be 0 or 1".into(),
            }]
        );
    }

    #[test]
    fn test_batch_collects_every_violation() {
        let records = vec![
            Record::new().with("tenure", "twelve"),
            Record::new().with("Contract", "Two year"),
            Record::new().with("MonthlyCharges", "lots").with("tenure", 1.5),
        ];
        match validate_batch(&records) {
            Err(ChurnError::Validation(violations)) => {
                let positions: Vec<(usize, &str)> = violations
                    .iter()
                    .map(|v| (v.record, v.field.as_str()))
                    .collect();
                assert_eq!(
                    positions,
                    vec![(0, "tenure"), (2, "MonthlyCharges"), (2, "tenure")]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_tenure_is_accepted() {
        assert!(validate_batch(&[Record::new().with("tenure", -1.0)]).is_ok());
        let violations = validate_record(0, &Record::new().with("tenure", -2.5));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "must be an integer");
    }

    #[test]
    fn test_null_is_accepted() {
        let record: Record = serde_json::from_str(r#"{"SeniorCitizen": null}"#).unwrap();
        assert!(validate_record(0, &record).is_empty());
    }
}
