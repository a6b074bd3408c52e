//! TradeRecord: a closed (or partially closed) position.

use super::position::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of units opened and later closed.
///
/// Appended by the broker whenever a position is closed, reduced or
/// reversed. `pnl` is net of the commission paid on both legs, so the sum
/// of `pnl` over the ledger equals the change in cash once the account is
/// flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub direction: Direction,

    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,

    pub units: f64,
    pub pnl: f64,
    pub commission: f64,
}

impl TradeRecord {
    /// Net P&L as a fraction of the raw entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.units;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}
