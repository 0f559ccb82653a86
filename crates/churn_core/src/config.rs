//! Layered configuration: built-in defaults, optional TOML file, `CHURN_*` environment

use crate::errors::Result;
use crate::upstream::WaitPolicy;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CHURN_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    /// Raw delimited training source
    pub raw_csv: PathBuf,
    /// Trained pipeline artifact
    pub model_path: PathBuf,
    /// Fitted transform written by the preprocess stage
    pub transform_path: PathBuf,
    pub matrix_path: PathBuf,
    pub labels_path: PathBuf,
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub bind_addr: String,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    pub prometheus_enabled: bool,
    /// Share of rows held out for evaluation; 0 disables the split
    pub holdout_fraction: f64,
    pub seed: u64,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            raw_csv: PathBuf::from("data/raw/WA_Fn-UseC_-Telco-Customer-Churn.csv"),
            model_path: PathBuf::from("models/churn_pipeline.json"),
            transform_path: PathBuf::from("models/preprocessor.json"),
            matrix_path: PathBuf::from("data/X.json"),
            labels_path: PathBuf::from("data/y.json"),
            wait_timeout_secs: 90,
            poll_interval_ms: 1000,
            bind_addr: "0.0.0.0:8000".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            prometheus_enabled: true,
            holdout_fraction: 0.2,
            seed: 42,
        }
    }
}

impl ChurnConfig {
    /// Load from `path` (or `$CHURN_CONFIG`) and the environment.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let file = path.map(Path::to_path_buf).or(env_path);

        let mut builder = Config::builder();
        if let Some(file) = &file {
            builder = builder.add_source(ConfigFile::from(file.as_path()).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("CHURN")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: ChurnConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.wait_timeout_secs),
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChurnConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/churn_pipeline.json"));
        assert_eq!(
            config.wait_policy(),
            WaitPolicy::new(Duration::from_secs(90), Duration::from_secs(1))
        );
    }

    #[test]
    fn test_file_overrides_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("churn.toml");
        std::fs::write(
            &path,
            "model_path = \"artifacts/model.json\"\nwait_timeout_secs = 5\nholdout_fraction = 0.0\n",
        )?;

        let config = ChurnConfig::load(Some(&path))?;
        assert_eq!(config.model_path, PathBuf::from("artifacts/model.json"));
        assert_eq!(config.wait_timeout_secs, 5);
        assert_eq!(config.holdout_fraction, 0.0);
        assert_eq!(config.poll_interval_ms, 1000);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(ChurnConfig::load(Some(&missing)).is_err());
    }
}
