//! Backtesting engine: broker simulator and the bar-by-bar loop.
//!
//! The engine consumes a validated [`PriceSeries`](crate::domain::PriceSeries)
//! plus any pre-bound indicators, drives one [`Strategy`](crate::strategy::Strategy)
//! through the bars after warm-up, and produces a [`RunResult`].

pub mod broker;
pub mod loop_runner;
pub mod state;

pub use broker::Broker;
pub use loop_runner::Backtest;
pub use state::{BacktestConfig, EngineError, EquityPoint, RunResult};
