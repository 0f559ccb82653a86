//! Training stages
//!
//! `fit` runs the whole flow in one process. `preprocess` and `train` split
//! it across two processes that communicate through files: the first
//! persists the fitted transform with its matrix and labels, the second
//! waits for them and fits the scorer.

use crate::deterministic::{stratified_split, HoldoutSplit};
use crate::errors::TrainerError;
use crate::evaluation::Evaluation;
use churn_core::artifact::hash_path;
use churn_core::{
    clean, file_digest, infer_schema, load_artifact, save_artifact, wait_for_all, ChurnConfig,
    ChurnError, CleanOptions, ColumnTransformPipeline, Dataset, FittedTransform,
    LogisticRegression, NumericMatrix, RawTable, Scorer, TrainedPipeline,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Outcome of a stage that persisted a trained pipeline
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub model_path: PathBuf,
    pub digest: String,
    pub training_rows: usize,
    pub output_width: usize,
    pub holdout: Option<Evaluation>,
}

/// Outcome of the preprocess stage
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessReport {
    pub transform_path: PathBuf,
    pub matrix_path: PathBuf,
    pub labels_path: PathBuf,
    pub rows: usize,
    pub output_width: usize,
}

fn load_dataset(path: &Path) -> Result<Dataset, TrainerError> {
    info!("Loading raw records from: {}", path.display());
    let table = RawTable::from_csv_path(path)?;
    let dataset = clean(&table, &CleanOptions::default())?;
    info!(
        "Loaded {} rows with {} feature columns (churn rate {:.3})",
        dataset.len(),
        dataset.feature_names().len(),
        dataset.positive_rate()
    );
    Ok(dataset)
}

fn split(labels: &[u8], config: &ChurnConfig) -> Result<HoldoutSplit, TrainerError> {
    let split = stratified_split(labels, config.holdout_fraction, config.seed)?;
    info!(
        "Holdout split (fraction {}, seed {}): {} train / {} holdout",
        config.holdout_fraction,
        config.seed,
        split.train.len(),
        split.holdout.len()
    );
    Ok(split)
}

fn log_evaluation(evaluation: &Evaluation) {
    match evaluation.roc_auc {
        Some(auc) => info!(
            "Holdout ROC-AUC: {:.4} | accuracy: {:.4} ({} rows)",
            auc, evaluation.accuracy, evaluation.rows
        ),
        None => info!(
            "Holdout accuracy: {:.4} ({} rows, single class so no ROC-AUC)",
            evaluation.accuracy, evaluation.rows
        ),
    }
}

/// Load, clean, split, fit transform + scorer on the training part,
/// evaluate on the holdout and persist one trained pipeline
#[instrument(skip(config), fields(raw = %config.raw_csv.display()))]
pub fn fit(config: &ChurnConfig) -> Result<TrainReport, TrainerError> {
    let dataset = load_dataset(&config.raw_csv)?;
    let split = split(&dataset.labels, config)?;
    let train_set = dataset.subset(&split.train);

    let pipeline = TrainedPipeline::fit(&train_set, LogisticRegression::default())?
        .with_training_data_hash(file_digest(&config.raw_csv)?);

    let holdout = if split.holdout.is_empty() {
        None
    } else {
        let holdout_set = dataset.subset(&split.holdout);
        let predictions = pipeline.predict_frame(&holdout_set.features)?;
        let evaluation = Evaluation::compute(&predictions.probabilities, &holdout_set.labels);
        log_evaluation(&evaluation);
        Some(evaluation)
    };

    let digest = pipeline.save(&config.model_path)?;
    info!("Saved trained pipeline to: {}", config.model_path.display());

    Ok(TrainReport {
        model_path: config.model_path.clone(),
        digest,
        training_rows: train_set.len(),
        output_width: pipeline.metadata.output_width,
        holdout,
    })
}

/// Fit the transform on the whole source and persist it with its matrix and labels
#[instrument(skip(config), fields(raw = %config.raw_csv.display()))]
pub fn preprocess(config: &ChurnConfig) -> Result<PreprocessReport, TrainerError> {
    let dataset = load_dataset(&config.raw_csv)?;
    let schema = infer_schema(&dataset.features)?;
    info!(
        "Inferred {} numeric and {} categorical columns",
        schema.numeric_columns.len(),
        schema.categorical_columns.len()
    );

    let mut transform = ColumnTransformPipeline::new();
    let matrix = transform.fit(&dataset.features, &schema)?;
    let state = transform
        .into_state()
        .ok_or_else(|| TrainerError::Training("transform produced no fitted state".into()))?;

    save_artifact(&state, &config.transform_path)?;
    save_artifact(&dataset.labels, &config.labels_path)?;
    save_artifact(&matrix, &config.matrix_path)?;

    info!(
        "Saved preprocessor -> {}, X -> {}, y -> {}, shape=({}, {})",
        config.transform_path.display(),
        config.matrix_path.display(),
        config.labels_path.display(),
        matrix.n_rows(),
        matrix.width()
    );

    Ok(PreprocessReport {
        transform_path: config.transform_path.clone(),
        matrix_path: config.matrix_path.clone(),
        labels_path: config.labels_path.clone(),
        rows: matrix.n_rows(),
        output_width: matrix.width(),
    })
}

fn select_rows(matrix: &NumericMatrix, indices: &[usize]) -> Result<NumericMatrix, ChurnError> {
    NumericMatrix::from_rows(
        matrix.width(),
        indices.iter().map(|&idx| matrix.row(idx).to_vec()).collect(),
    )
}

/// Wait for preprocess outputs, fit the scorer and persist one trained pipeline
#[instrument(skip(config), fields(model = %config.model_path.display()))]
pub fn train(config: &ChurnConfig) -> Result<TrainReport, TrainerError> {
    // digests are written last, so their presence marks a complete artifact
    let upstream = [
        hash_path(&config.matrix_path),
        hash_path(&config.labels_path),
        hash_path(&config.transform_path),
    ];
    wait_for_all(&upstream, &config.wait_policy())?;

    let transform: FittedTransform = load_artifact(&config.transform_path)?;
    let matrix: NumericMatrix = load_artifact(&config.matrix_path)?;
    let labels: Vec<u8> = load_artifact(&config.labels_path)?;
    matrix.validate()?;

    if matrix.width() != transform.output_width() {
        return Err(ChurnError::Schema(format!(
            "matrix has {} columns but the transform produces {}",
            matrix.width(),
            transform.output_width()
        ))
        .into());
    }
    if matrix.n_rows() != labels.len() {
        return Err(ChurnError::Schema(format!(
            "matrix has {} rows but {} labels were provided",
            matrix.n_rows(),
            labels.len()
        ))
        .into());
    }

    let split = split(&labels, config)?;
    let train_x = select_rows(&matrix, &split.train)?;
    let train_y: Vec<u8> = split.train.iter().map(|&idx| labels[idx]).collect();

    let mut scorer = LogisticRegression::default();
    scorer.fit(&train_x, &train_y)?;

    let holdout = if split.holdout.is_empty() {
        None
    } else {
        let holdout_x = select_rows(&matrix, &split.holdout)?;
        let holdout_y: Vec<u8> = split.holdout.iter().map(|&idx| labels[idx]).collect();
        let evaluation = Evaluation::compute(&scorer.predict_proba(&holdout_x)?, &holdout_y);
        log_evaluation(&evaluation);
        Some(evaluation)
    };

    let pipeline = TrainedPipeline::from_parts(transform, scorer, train_y.len())
        .with_training_data_hash(file_digest(&config.matrix_path)?);
    let digest = pipeline.save(&config.model_path)?;
    info!(
        "Model saved -> {} | {} features",
        config.model_path.display(),
        pipeline.metadata.output_width
    );

    Ok(TrainReport {
        model_path: config.model_path.clone(),
        digest,
        training_rows: train_y.len(),
        output_width: pipeline.metadata.output_width,
        holdout,
    })
}
