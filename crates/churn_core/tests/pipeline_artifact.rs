//! End-to-end core flow: raw CSV -> clean -> fit -> persist -> reload -> score

use anyhow::Result;
use churn_core::artifact::hash_path;
use churn_core::{
    clean, ChurnError, CleanOptions, LogisticRegression, RawTable, Record, TrainedPipeline,
};
use std::io::Cursor;

const TELCO_SAMPLE: &str = "\
customerID,gender,SeniorCitizen,tenure,Contract,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,0,1,Month-to-month,29.85,29.85,Yes
5575-GNVDE,Male,0,34,One year,56.95,1889.5,No
3668-QPYBK,Male,0,2,Month-to-month,53.85,108.15,Yes
7795-CFOCW,Male,0,45,One year,42.3,1840.75,No
9237-HQITU,Female,1,2,Month-to-month,70.7,151.65,Yes
9305-CDSKC,Female,0,8,Month-to-month,99.65,820.5,Yes
1452-KIOVK,Male,0,22,Month-to-month,89.1,1949.4,No
6713-OKOMC,Female,0,10,Month-to-month,29.75,301.9,No
7892-POOKP,Female,0,28,Month-to-month,104.8,3046.05,Yes
4190-MFLUW,Female,0,0,Two year,52.55, ,No
8091-TTVAX,Male,0,58,One year,100.35,5681.1,No
0280-XJGEX,Male,0,49,Month-to-month,103.7,5036.3,Yes
";

fn trained() -> Result<TrainedPipeline> {
    let table = RawTable::from_reader(Cursor::new(TELCO_SAMPLE))?;
    let dataset = clean(&table, &CleanOptions::default())?;
    Ok(TrainedPipeline::fit(&dataset, LogisticRegression::default())?)
}

#[test]
fn test_cleaned_sample_drops_identifier_and_coerces_charges() -> Result<()> {
    let table = RawTable::from_reader(Cursor::new(TELCO_SAMPLE))?;
    let dataset = clean(&table, &CleanOptions::default())?;

    assert!(!dataset.feature_names().iter().any(|name| name == "customerID"));
    assert!(!dataset.feature_names().iter().any(|name| name == "Churn"));
    assert_eq!(dataset.len(), 12);

    let pipeline = TrainedPipeline::fit(&dataset, LogisticRegression::default())?;
    let schema = &pipeline.transform.schema;
    assert!(schema.numeric_columns.contains(&"TotalCharges".to_string()));
    assert!(schema.categorical_columns.contains(&"Contract".to_string()));
    Ok(())
}

#[test]
fn test_saved_pipeline_reloads_as_one_unit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("models").join("churn_pipeline.json");

    let pipeline = trained()?;
    let digest = pipeline.save(&path)?;
    assert_eq!(std::fs::read_to_string(hash_path(&path))?, digest);

    let reloaded: TrainedPipeline = TrainedPipeline::load(&path)?;
    assert_eq!(reloaded, pipeline);

    let batch = vec![
        Record::new()
            .with("tenure", 3.0)
            .with("Contract", "Month-to-month")
            .with("MonthlyCharges", 95.0),
        Record::new().with("Contract", "Two year").with("nickname", "ok"),
        Record::new(),
    ];
    let before = pipeline.predict_records(&batch)?;
    let after = reloaded.predict_records(&batch)?;
    assert_eq!(before, after);
    assert_eq!(after.len(), 3);
    assert!(after.probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(after.predictions.iter().all(|&label| label <= 1));
    Ok(())
}

#[test]
fn test_saving_twice_produces_identical_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pipeline = trained()?;
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    pipeline.save(&a)?;
    pipeline.save(&b)?;
    assert_eq!(std::fs::read(a)?, std::fs::read(b)?);
    Ok(())
}

#[test]
fn test_tampered_artifact_fails_to_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("churn_pipeline.json");
    trained()?.save(&path)?;

    let mut bytes = std::fs::read(&path)?;
    bytes.extend_from_slice(b"\n");
    std::fs::write(&path, bytes)?;

    match TrainedPipeline::<LogisticRegression>::load(&path) {
        Err(ChurnError::ArtifactIntegrity(_)) => Ok(()),
        other => panic!("expected integrity failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_label_column_is_schema_error() -> Result<()> {
    let table = RawTable::from_reader(Cursor::new("customerID,tenure\nA,1\n"))?;
    assert!(matches!(
        clean(&table, &CleanOptions::default()),
        Err(ChurnError::Schema(_))
    ));
    Ok(())
}
