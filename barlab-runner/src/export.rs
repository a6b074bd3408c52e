//! Reporting and export: JSON, CSV, and Markdown artifacts.
//!
//! Provides three export formats for dataset reports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade ledger and equity curve for external tools
//! - **Markdown**: a per-dataset summary and a side-by-side batch table
//!
//! Persisted JSON carries a `schema_version` field. Newer versions are
//! rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use barlab_core::domain::TradeRecord;
use barlab_core::engine::EquityPoint;

use crate::config::artifact_dir_name;
use crate::runner::{DatasetReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `DatasetReport` to pretty JSON.
pub fn export_json(report: &DatasetReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize DatasetReport to JSON")
}

/// Deserialize a `DatasetReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<DatasetReport> {
    let report: DatasetReport =
        serde_json::from_str(json).context("failed to deserialize DatasetReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV.
///
/// Columns: direction, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, units, pnl, return_pct, commission, bars_held
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "direction",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "units",
        "pnl",
        "return_pct",
        "commission",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.direction),
            &t.entry_index.to_string(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.units),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.return_pct() * 100.0),
            &format!("{:.2}", t.commission),
            &t.bars_held().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with timestamp, equity and exposure columns.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity", "exposed"])?;
    for p in equity_curve {
        wtr.write_record([
            &p.timestamp.to_rfc3339(),
            &format!("{:.2}", p.equity),
            &p.exposed.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Human-readable summary of one dataset report.
pub fn render_summary(report: &DatasetReport) -> String {
    let m = &report.metrics;
    let r = &report.result;
    let span = match (r.equity_curve.first(), r.equity_curve.last()) {
        (Some(first), Some(last)) => format!("{} .. {}", first.timestamp, last.timestamp),
        _ => "none".to_string(),
    };

    let mut out = format!(
        "# BarLab Report: {}\n\n\
Run ID: `{}`\n\n\
Strategy: `{}`\n\n\
## Summary\n\
| Metric | Value |\n\
|--------|-------|\n\
| Bars (warm-up / processed) | {} ({} / {}) |\n\
| Period | {} |\n\
| Start Equity | {:.2} |\n\
| Final Equity | {:.2} |\n\
| Peak Equity | {:.2} |\n\
| Return | {:+.2}% |\n\
| Buy & Hold Return | {:+.2}% |\n\
| Max Drawdown | {:.2}% |\n\
| Max Drawdown Duration | {} bars |\n\
| Exposure | {:.1}% |\n\
| Trades | {} |\n\
| Win Rate | {:.1}% |\n\
| Best Trade | {:+.2}% |\n\
| Worst Trade | {:+.2}% |\n\
| Avg Trade | {:+.2}% |\n\
| Avg Bars Held | {:.1} |\n\
| Profit Factor | {:.2} |\n\
| Commission Paid | {:.2} |\n\
| Rejected Orders | {} |\n",
        report.dataset,
        report.run_id,
        report.strategy,
        report.bar_count,
        r.warmup_bars,
        r.bars_processed,
        span,
        m.start_equity,
        m.final_equity,
        m.peak_equity,
        m.total_return * 100.0,
        m.buy_and_hold_return * 100.0,
        m.max_drawdown * 100.0,
        m.max_drawdown_bars,
        m.exposure * 100.0,
        m.trade_count,
        m.win_rate * 100.0,
        m.best_trade * 100.0,
        m.worst_trade * 100.0,
        m.avg_trade * 100.0,
        m.avg_bars_held,
        m.profit_factor,
        m.total_commission,
        m.rejected_orders,
    );

    if let Some(pos) = &r.open_position {
        let _ = write!(
            out,
            "\n## Open Position\n\n{:?} {:.4} units @ {:.2} since bar {}, unrealized PnL {:+.2}\n",
            pos.direction,
            pos.units,
            pos.entry_price,
            pos.entry_index,
            m.open_pnl
        );
    }

    if !r.trades.is_empty() {
        out.push_str("\n## Trades\n\n");
        out.push_str("| # | Direction | Entry | Exit | Units | PnL | Return |\n");
        out.push_str("|---|-----------|-------|------|-------|-----|--------|\n");
        for (i, t) in r.trades.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {:?} | {} @ {:.2} | {} @ {:.2} | {:.4} | {:+.2} | {:+.2}% |",
                i + 1,
                t.direction,
                t.entry_time,
                t.entry_price,
                t.exit_time,
                t.exit_price,
                t.units,
                t.pnl,
                t.return_pct() * 100.0
            );
        }
    }

    out
}

/// Side-by-side table of several dataset reports.
pub fn render_batch_table(reports: &[&DatasetReport]) -> String {
    let mut out = String::from(
        "| Dataset | Bars | Trades | Return | Buy & Hold | Max DD | Win Rate | Final Equity |\n\
|---------|------|--------|--------|------------|--------|----------|--------------|\n",
    );
    for r in reports {
        let m = &r.metrics;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:+.2}% | {:+.2}% | {:.2}% | {:.1}% | {:.2} |",
            r.dataset,
            r.bar_count,
            m.trade_count,
            m.total_return * 100.0,
            m.buy_and_hold_return * 100.0,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.final_equity
        );
    }
    out
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one dataset report.
///
/// Creates `output_dir/{dataset}/` containing:
/// - `result.json`: the full `DatasetReport`
/// - `trades.csv`: trade ledger
/// - `equity.csv`: equity curve
/// - `summary.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &DatasetReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(&report.dataset));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, contents: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    write("result.json", export_json(report)?)?;
    write("trades.csv", export_trades_csv(&report.result.trades)?)?;
    write("equity.csv", export_equity_csv(&report.result.equity_curve)?)?;
    write("summary.md", render_summary(report))?;

    Ok(run_dir)
}

/// Load a `DatasetReport` from an artifact directory's result.json.
pub fn load_artifacts(run_dir: &Path) -> Result<DatasetReport> {
    let path = run_dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
