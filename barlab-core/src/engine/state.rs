//! Engine configuration, errors, and run result types.

use crate::domain::{Order, Position, TradeRecord};
use crate::indicators::BindError;
use crate::strategy::StrategyFault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account settings for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub starting_cash: f64,
    /// Fraction of notional charged on every fill, in `[0, 1)`.
    pub commission_rate: f64,
    /// Sells only reduce an open long; no short positions.
    pub exclusive_orders: bool,
    /// Flatten any open position at the last bar's close.
    pub close_on_finish: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_cash: 10_000.0,
            commission_rate: 0.002,
            exclusive_orders: true,
            close_on_finish: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.starting_cash.is_finite() && self.starting_cash > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "starting_cash must be positive, got {}",
                self.starting_cash
            )));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(EngineError::InvalidConfig(format!(
                "commission_rate must be in [0, 1), got {}",
                self.commission_rate
            )));
        }
        Ok(())
    }
}

/// Fatal run errors. Order rejections are not errors; they are recorded on
/// the order list.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("strategy '{strategy}' failed to initialize: {source}")]
    StrategyInit {
        strategy: String,
        #[source]
        source: StrategyFault,
    },

    #[error("strategy failed at bar {bar_index} ({timestamp}): {source}")]
    Strategy {
        bar_index: usize,
        timestamp: DateTime<Utc>,
        #[source]
        source: StrategyFault,
    },
}

/// One point of the equity curve, recorded after the bar's orders settle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    /// A position was open at the bar's close.
    pub exposed: bool,
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    /// Closed (or partially closed) positions, in close order.
    pub trades: Vec<TradeRecord>,
    /// Every submitted order, including rejected and cancelled ones.
    pub orders: Vec<Order>,
    /// One point per processed bar.
    pub equity_curve: Vec<EquityPoint>,
    pub starting_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    /// Position still open after the last bar, if any.
    pub open_position: Option<Position>,
    /// Leading bars skipped because an indicator was undefined.
    pub warmup_bars: usize,
    pub bars_processed: usize,
}

impl RunResult {
    /// Result of a run that never reached a processable bar.
    pub fn empty(strategy: &str, starting_cash: f64, warmup_bars: usize) -> Self {
        Self {
            strategy: strategy.to_string(),
            trades: Vec::new(),
            orders: Vec::new(),
            equity_curve: Vec::new(),
            starting_cash,
            final_cash: starting_cash,
            final_equity: starting_cash,
            open_position: None,
            warmup_bars,
            bars_processed: 0,
        }
    }

    /// BLAKE3 hex digest of the JSON serialization.
    ///
    /// Field order is fixed by the struct layout, so equal results hash equally.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("RunResult must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Net profit over the run: final equity minus starting cash.
    pub fn net_profit(&self) -> f64 {
        self.final_equity - self.starting_cash
    }

    pub fn rejected_orders(&self) -> usize {
        self.orders.iter().filter(|o| o.is_rejected()).count()
    }
}
