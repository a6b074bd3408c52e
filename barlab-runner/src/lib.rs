//! BarLab Runner: configuration, data loading, batch execution, metrics.
//!
//! This crate builds on `barlab-core` to provide:
//! - TOML run configs naming the account, strategy and datasets
//! - CSV loading and deterministic synthetic series
//! - Parallel per-dataset execution with per-dataset error isolation
//! - Performance metrics and JSON/CSV/Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, DatasetConfig, DatasetSource, RunConfig, RunId, SyntheticSpec};
pub use data_loader::{
    dataset_hash, generate_synthetic, load_csv, load_csv_from_reader, load_dataset, LoadError,
};
pub use export::{
    export_equity_csv, export_json, export_trades_csv, import_json, load_artifacts,
    render_batch_table, render_summary, save_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use runner::{
    load_and_run, run_batch, run_config, run_dataset, DatasetReport, RunError, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<DatasetReport>();
        assert_sync::<DatasetReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
