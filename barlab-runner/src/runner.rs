//! Backtest runner: wires together data loading, the engine, and metrics.
//!
//! Two entry points:
//! - `run_dataset()`: one pre-loaded series, no I/O.
//! - `run_batch()`: loads every dataset in a `RunConfig` and runs them in
//!   parallel. Each dataset gets its own strategy instance and account.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use barlab_core::domain::PriceSeries;
use barlab_core::engine::{Backtest, BacktestConfig, EngineError, RunResult};

use crate::config::{ConfigError, DatasetConfig, RunConfig, RunId};
use crate::data_loader::{dataset_hash, load_dataset, LoadError};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("dataset '{dataset}': {source}")]
    Load {
        dataset: String,
        #[source]
        source: LoadError,
    },

    #[error("dataset '{dataset}': {source}")]
    Engine {
        dataset: String,
        #[source]
        source: EngineError,
    },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one strategy over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset: String,
    pub dataset_hash: String,
    pub bar_count: usize,
    /// Strategy label including its parameters.
    pub strategy: String,
    pub account: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub result: RunResult,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run the configured strategy over one pre-loaded series.
pub fn run_dataset(
    config: &RunConfig,
    dataset: &str,
    series: Arc<PriceSeries>,
) -> Result<DatasetReport, RunError> {
    let engine_err = |source| RunError::Engine {
        dataset: dataset.to_string(),
        source,
    };

    let backtest = Backtest::new(Arc::clone(&series), config.account.clone());
    let mut strategy = config.strategy.build();
    let result = backtest.run(strategy.as_mut()).map_err(engine_err)?;
    let metrics = PerformanceMetrics::compute(&result, &series);

    info!(
        dataset,
        trades = metrics.trade_count,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        "dataset finished"
    );

    Ok(DatasetReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        dataset: dataset.to_string(),
        dataset_hash: dataset_hash(&series),
        bar_count: series.len(),
        strategy: config.strategy.label(),
        account: config.account.clone(),
        metrics,
        result,
    })
}

/// Load one dataset from the config and run it.
pub fn load_and_run(
    config: &RunConfig,
    dataset: &DatasetConfig,
    base_dir: &Path,
) -> Result<DatasetReport, RunError> {
    let series = load_dataset(dataset, base_dir).map_err(|source| RunError::Load {
        dataset: dataset.name.clone(),
        source,
    })?;
    run_dataset(config, &dataset.name, Arc::new(series))
}

/// Run every dataset in `config`, in parallel.
///
/// Results come back in dataset order. One failing dataset does not stop the
/// others; its slot holds the error.
pub fn run_batch(config: &RunConfig, base_dir: &Path) -> Vec<Result<DatasetReport, RunError>> {
    let results: Vec<_> = config
        .datasets
        .par_iter()
        .map(|ds| load_and_run(config, ds, base_dir))
        .collect();

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!(error = %err, "dataset failed");
    }
    results
}

/// Validate `config`, then [`run_batch`].
pub fn run_config(
    config: &RunConfig,
    base_dir: &Path,
) -> Result<Vec<Result<DatasetReport, RunError>>, RunError> {
    config.validate()?;
    info!(
        run_id = %config.run_id(),
        strategy = %config.strategy.label(),
        datasets = config.datasets.len(),
        "starting batch"
    );
    Ok(run_batch(config, base_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetConfig, SyntheticSpec};
    use barlab_core::strategy::{EmaCrossParams, StrategyConfig};

    fn synthetic_config(names: &[&str]) -> RunConfig {
        RunConfig {
            account: BacktestConfig::default(),
            strategy: StrategyConfig::EmaCrossMcGinley(EmaCrossParams {
                fast_period: 5,
                slow_period: 20,
                trend_period: 8,
            }),
            datasets: names
                .iter()
                .map(|n| {
                    DatasetConfig::synthetic(
                        *n,
                        SyntheticSpec {
                            bars: 400,
                            ..SyntheticSpec::default()
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn batch_preserves_dataset_order() {
        let config = synthetic_config(&["a", "b", "c"]);
        let reports = run_batch(&config, Path::new("."));
        let names: Vec<_> = reports
            .iter()
            .map(|r| r.as_ref().unwrap().dataset.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_csv_fails_only_that_dataset() {
        let mut config = synthetic_config(&["ok"]);
        config
            .datasets
            .push(DatasetConfig::csv("missing", "no/such/file.csv"));
        let reports = run_batch(&config, Path::new("/nonexistent"));
        assert!(reports[0].is_ok());
        assert!(matches!(reports[1], Err(RunError::Load { .. })));
    }

    #[test]
    fn report_carries_identity() {
        let config = synthetic_config(&["a"]);
        let report = load_and_run(&config, &config.datasets[0], Path::new(".")).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.run_id, config.run_id());
        assert_eq!(report.bar_count, 400);
        assert_eq!(report.strategy, "ema_cross_mcginley(5,20,8)");
        assert_eq!(report.result.warmup_bars, 19);
    }
}
