//! Binary scorer contract and the default logistic-regression scorer

use crate::errors::{ChurnError, Result};
use crate::matrix::NumericMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Probability at or above which a record is labeled as churn
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Any binary classifier over the transformed matrix
pub trait Scorer {
    /// Fit on a matrix and its parallel 0/1 labels
    fn fit(&mut self, x: &NumericMatrix, y: &[u8]) -> Result<()>;

    /// Probability of the positive class, one per row
    fn predict_proba(&self, x: &NumericMatrix) -> Result<Vec<f64>>;

    /// Short name recorded in artifact metadata
    fn name(&self) -> &'static str;

    /// Hard labels using [`DECISION_THRESHOLD`]
    fn predict(&self, x: &NumericMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(to_label)
            .collect())
    }
}

pub fn to_label(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

/// Gradient-descent hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub learning_rate: f64,
    /// L2 penalty strength
    pub alpha: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm drops below this
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            alpha: 1e-4,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// L2-regularised logistic regression fit by full-batch gradient descent.
/// Weights start at zero, so fitting is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticParams,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub fitted: bool,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.intercept
            + row
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Scorer for LogisticRegression {
    fn fit(&mut self, x: &NumericMatrix, y: &[u8]) -> Result<()> {
        let n_samples = x.n_rows();
        let n_features = x.width();

        if n_samples != y.len() {
            return Err(ChurnError::Scorer(format!(
                "{} rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(ChurnError::Scorer("cannot fit on an empty matrix".into()));
        }
        if let Some(bad) = y.iter().find(|&&label| label > 1) {
            return Err(ChurnError::Scorer(format!("label {} is not binary", bad)));
        }

        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        let mut dw = vec![0.0; n_features];
        let lr = self.params.learning_rate;
        let alpha = self.params.alpha;
        let n = n_samples as f64;
        let mut iterations = 0;

        for _ in 0..self.params.max_iter {
            iterations += 1;
            dw.iter_mut().for_each(|g| *g = 0.0);
            let mut db = 0.0;

            for (row, &label) in x.rows().zip(y) {
                let z = bias + row.iter().zip(&weights).map(|(a, w)| a * w).sum::<f64>();
                let error = sigmoid(z) - f64::from(label);
                for (g, a) in dw.iter_mut().zip(row) {
                    *g += error * a;
                }
                db += error;
            }

            for (g, w) in dw.iter_mut().zip(&weights) {
                *g = *g / n + alpha * w;
            }
            db /= n;

            let grad_norm = (dw.iter().map(|g| g * g).sum::<f64>() + db * db).sqrt();
            if grad_norm < self.params.tol {
                break;
            }

            for (w, g) in weights.iter_mut().zip(&dw) {
                *w -= lr * g;
            }
            bias -= lr * db;
        }

        debug!("Logistic regression converged after {} iterations", iterations);
        info!(
            "Fitted logistic regression on {} rows x {} features",
            n_samples, n_features
        );

        self.weights = weights;
        self.intercept = bias;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &NumericMatrix) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ChurnError::Scorer("scorer has not been fitted".into()));
        }
        if x.width() != self.weights.len() {
            return Err(ChurnError::Scorer(format!(
                "expected {} features, got {}",
                self.weights.len(),
                x.width()
            )));
        }
        Ok(x.rows().map(|row| sigmoid(self.decision(row))).collect())
    }

    fn name(&self) -> &'static str {
        "logistic_regression"
    }
}
