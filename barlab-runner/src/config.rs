//! Serializable run configuration.
//!
//! One TOML file describes the account settings, the strategy, and the
//! datasets to run it on:
//!
//! ```toml
//! [account]
//! starting_cash = 10000.0
//! commission_rate = 0.002
//! exclusive_orders = true
//!
//! [strategy]
//! type = "EMA_CROSS_MCGINLEY"
//! fast_period = 51
//! slow_period = 101
//! trend_period = 21
//!
//! [[datasets]]
//! name = "ITC.NS"
//! path = "data/itc_15m.csv"
//! ```

use barlab_core::engine::BacktestConfig;
use barlab_core::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a (possibly multi-dataset) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub account: BacktestConfig,

    #[serde(default)]
    pub strategy: StrategyConfig,

    pub datasets: Vec<DatasetConfig>,
}

/// One price series to run the strategy on.
///
/// Exactly one of `path` (CSV file) or `synthetic` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticSpec>,
}

/// Parameters for a deterministic synthetic random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpec {
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    pub interval_minutes: i64,
    /// Largest absolute per-bar return, as a fraction.
    pub max_step: f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            bars: 2_000,
            seed: 42,
            start_price: 100.0,
            interval_minutes: 15,
            max_step: 0.01,
        }
    }
}

/// Where a dataset's bars come from, after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatasetSource<'a> {
    Csv(&'a Path),
    Synthetic(&'a SyntheticSpec),
}

impl DatasetConfig {
    pub fn csv(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            synthetic: None,
        }
    }

    pub fn synthetic(name: impl Into<String>, spec: SyntheticSpec) -> Self {
        Self {
            name: name.into(),
            path: None,
            synthetic: Some(spec),
        }
    }

    pub fn source(&self) -> Result<DatasetSource<'_>, ConfigError> {
        match (&self.path, &self.synthetic) {
            (Some(path), None) => Ok(DatasetSource::Csv(path)),
            (None, Some(spec)) => Ok(DatasetSource::Synthetic(spec)),
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "dataset '{}' sets both path and synthetic",
                self.name
            ))),
            (None, None) => Err(ConfigError::Invalid(format!(
                "dataset '{}' needs a path or a synthetic section",
                self.name
            ))),
        }
    }
}

impl RunConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.account
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.datasets.is_empty() {
            return Err(ConfigError::Invalid("at least one dataset is required".into()));
        }
        let mut seen = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for ds in &self.datasets {
            if ds.name.trim().is_empty() {
                return Err(ConfigError::Invalid("dataset name must not be empty".into()));
            }
            if !seen.insert(ds.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' is listed twice",
                    ds.name
                )));
            }
            if !dirs.insert(artifact_dir_name(&ds.name)) {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' shares its artifact directory '{}' with another dataset",
                    ds.name,
                    artifact_dir_name(&ds.name)
                )));
            }
            if let DatasetSource::Synthetic(spec) = ds.source()? {
                if spec.bars == 0 || spec.interval_minutes <= 0 {
                    return Err(ConfigError::Invalid(format!(
                        "dataset '{}': synthetic bars and interval must be positive",
                        ds.name
                    )));
                }
                if !(spec.start_price.is_finite() && spec.start_price > 0.0)
                    || !(0.0..1.0).contains(&spec.max_step)
                {
                    return Err(ConfigError::Invalid(format!(
                        "dataset '{}': start_price must be positive and max_step in [0, 1)",
                        ds.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs get the same `RunId`.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// The reference setup: the EMA cross strategy with default periods on two
    /// 15-minute NSE series.
    pub fn sample() -> Self {
        Self {
            account: BacktestConfig::default(),
            strategy: StrategyConfig::default(),
            datasets: vec![
                DatasetConfig::csv("dhani.NS", "data/dhani_15m.csv"),
                DatasetConfig::csv("ITC.NS", "data/itc_15m.csv"),
            ],
        }
    }
}

/// Directory-safe form of a dataset name (`ITC.NS` stays `ITC.NS`).
pub fn artifact_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
