//! Performance metrics: pure functions that summarize a run.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar
//! out. Fractions are reported as fractions (0.05 = 5%), not percentages.

use barlab_core::domain::{PriceSeries, TradeRecord};
use barlab_core::engine::{EquityPoint, RunResult};
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub start_equity: f64,
    pub final_equity: f64,
    pub peak_equity: f64,
    pub total_return: f64,
    /// Return of holding the asset from the first processed close to the last.
    pub buy_and_hold_return: f64,
    pub max_drawdown: f64,
    /// Longest stretch of bars spent below a previous equity peak.
    pub max_drawdown_bars: usize,
    /// Fraction of processed bars with an open position.
    pub exposure: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_trade: f64,
    pub avg_bars_held: f64,
    pub profit_factor: f64,
    pub total_commission: f64,
    pub rejected_orders: usize,
    /// Unrealized P&L of a position still open at the last close.
    #[serde(default)]
    pub open_pnl: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics for `result`, which must come from a run over `series`.
    pub fn compute(result: &RunResult, series: &PriceSeries) -> Self {
        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        let first_close = series.bar_at(result.warmup_bars).map(|b| b.close);
        let last_close = series.last().close;
        let buy_and_hold_return = match first_close {
            Some(first) if result.bars_processed > 0 && first > 0.0 => {
                (last_close - first) / first
            }
            _ => 0.0,
        };

        Self {
            start_equity: result.starting_cash,
            final_equity: result.final_equity,
            peak_equity: equity
                .iter()
                .copied()
                .fold(result.starting_cash, f64::max),
            total_return: total_return(result.starting_cash, result.final_equity),
            buy_and_hold_return,
            max_drawdown: max_drawdown(result.starting_cash, &equity),
            max_drawdown_bars: max_drawdown_duration(result.starting_cash, &equity),
            exposure: exposure(&result.equity_curve),
            trade_count: result.trades.len(),
            win_rate: win_rate(&result.trades),
            best_trade: result
                .trades
                .iter()
                .map(|t| t.return_pct())
                .reduce(f64::max)
                .unwrap_or(0.0),
            worst_trade: result
                .trades
                .iter()
                .map(|t| t.return_pct())
                .reduce(f64::min)
                .unwrap_or(0.0),
            avg_trade: avg_trade_return(&result.trades),
            avg_bars_held: avg_bars_held(&result.trades),
            profit_factor: profit_factor(&result.trades),
            total_commission: result.trades.iter().map(|t| t.commission).sum(),
            rejected_orders: result.rejected_orders(),
            open_pnl: result
                .open_position
                .as_ref()
                .map_or(0.0, |pos| pos.unrealized_pnl(last_close)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// The peak starts at `initial`, so a run that loses from the first bar
/// still shows a drawdown. Returns 0.0 if equity never falls below a peak.
pub fn max_drawdown(initial: f64, equity_curve: &[f64]) -> f64 {
    let mut peak = initial;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Longest run of consecutive bars below the running peak.
pub fn max_drawdown_duration(initial: f64, equity_curve: &[f64]) -> usize {
    let mut peak = initial;
    let mut current = 0usize;
    let mut longest = 0usize;

    for &eq in equity_curve {
        if eq >= peak {
            peak = eq;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

/// Fraction of equity points with an open position.
pub fn exposure(equity_curve: &[EquityPoint]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }
    let exposed = equity_curve.iter().filter(|p| p.exposed).count();
    exposed as f64 / equity_curve.len() as f64
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean per-trade return (fraction of entry notional).
pub fn avg_trade_return(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.return_pct()).sum::<f64>() / trades.len() as f64
}

pub fn avg_bars_held(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held() as f64).sum::<f64>() / trades.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use barlab_core::domain::Direction;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(pnl: f64, entry: f64, units: f64, bars: usize) -> TradeRecord {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap();
        TradeRecord {
            direction: Direction::Long,
            entry_index: 0,
            entry_time: t0,
            entry_price: entry,
            exit_index: bars,
            exit_time: t0 + Duration::minutes(15 * bars as i64),
            exit_price: entry + pnl / units,
            units,
            pnl,
            commission: 0.0,
        }
    }

    #[test]
    fn total_return_basic() {
        assert!((total_return(100.0, 110.0) - 0.10).abs() < 1e-12);
        assert_eq!(total_return(0.0, 10.0), 0.0);
    }

    #[test]
    fn max_drawdown_from_initial_peak() {
        assert!((max_drawdown(100.0, &[90.0, 95.0]) - -0.10).abs() < 1e-12);
        assert!((max_drawdown(100.0, &[120.0, 90.0, 130.0]) - -0.25).abs() < 1e-12);
        assert_eq!(max_drawdown(100.0, &[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(100.0, &[]), 0.0);
    }

    #[test]
    fn drawdown_duration_counts_underwater_bars() {
        assert_eq!(
            max_drawdown_duration(100.0, &[101.0, 99.0, 98.0, 102.0, 100.0]),
            2
        );
        assert_eq!(max_drawdown_duration(100.0, &[100.0, 100.0]), 0);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let trades = vec![
            trade(50.0, 100.0, 1.0, 2),
            trade(-25.0, 100.0, 1.0, 4),
            trade(25.0, 100.0, 1.0, 6),
        ];
        assert!((win_rate(&trades) - 2.0 / 3.0).abs() < 1e-12);
        assert!((profit_factor(&trades) - 3.0).abs() < 1e-12);
        assert!((avg_bars_held(&trades) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_caps_without_losses() {
        assert_eq!(profit_factor(&[trade(10.0, 100.0, 1.0, 1)]), 100.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn exposure_fraction() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap();
        let point = |exposed| EquityPoint {
            timestamp: t,
            equity: 1.0,
            exposed,
        };
        assert_eq!(exposure(&[point(true), point(false)]), 0.5);
        assert_eq!(exposure(&[]), 0.0);
    }
}
