//! BarLab Core: price series, indicators, strategy contract, broker simulator
//! and the bar-by-bar backtest loop.
//!
//! This crate contains the engine:
//! - Domain types (bars, orders, fills, positions, trades)
//! - Indicator transforms and their binding to the bar timeline
//! - The `Strategy` trait and the bundled strategies
//! - A netting broker that settles orders at the bar close
//! - The loop that ties them together and produces a `RunResult`
//!
//! The engine does no I/O and reads no clock. Identical inputs produce
//! identical results.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

pub use domain::{PriceSeries, SeriesError};
pub use engine::{Backtest, BacktestConfig, EngineError, RunResult};
pub use strategy::{Strategy, StrategyConfig};
