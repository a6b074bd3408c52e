//! BarLab CLI: run backtests from a config file, a single CSV, or synthetic data.
//!
//! Commands:
//! - `run`: execute every dataset in a TOML config, or one CSV with flag overrides
//! - `demo`: run the configured strategy over a deterministic synthetic series
//! - `init-config`: write a sample config to start from

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use barlab_core::strategy::{EmaCrossParams, StrategyConfig};
use barlab_runner::{
    render_batch_table, render_summary, run_config, save_artifacts, DatasetConfig, DatasetReport,
    RunConfig, SyntheticSpec,
};
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "barlab", about = "BarLab CLI: bar-by-bar strategy backtester")]
struct Cli {
    /// Log level filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a TOML config file or a single CSV.
    Run {
        /// Path to a TOML config file.
        #[arg(long, conflicts_with = "csv")]
        config: Option<PathBuf>,

        /// Path to a single CSV of bars.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Dataset name for --csv. Defaults to the file stem.
        #[arg(long, requires = "csv")]
        name: Option<String>,

        #[command(flatten)]
        overrides: Overrides,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Run over a deterministic synthetic random walk.
    Demo {
        /// Number of bars to generate.
        #[arg(long, default_value_t = 2_000)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        overrides: Overrides,

        /// Output directory for artifacts. Nothing is written without it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a sample config file.
    InitConfig {
        /// Where to write the config.
        #[arg(long, default_value = "barlab.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Account and strategy settings that override the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long)]
    cash: Option<f64>,

    /// Commission as a fraction of notional (0.002 = 0.2%).
    #[arg(long)]
    commission: Option<f64>,

    /// Allow shorts and pyramiding instead of exclusive orders.
    #[arg(long, default_value_t = false)]
    no_exclusive: bool,

    /// Liquidate any open position at the last bar.
    #[arg(long, default_value_t = false)]
    close_on_finish: bool,

    /// Use the buy-and-hold baseline instead of the EMA cross.
    #[arg(long, default_value_t = false, conflicts_with_all = ["fast", "slow", "trend"])]
    buy_and_hold: bool,

    #[arg(long)]
    fast: Option<usize>,

    #[arg(long)]
    slow: Option<usize>,

    #[arg(long)]
    trend: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(cash) = self.cash {
            config.account.starting_cash = cash;
        }
        if let Some(commission) = self.commission {
            config.account.commission_rate = commission;
        }
        if self.no_exclusive {
            config.account.exclusive_orders = false;
        }
        if self.close_on_finish {
            config.account.close_on_finish = true;
        }

        if self.buy_and_hold {
            config.strategy = StrategyConfig::BuyAndHold;
            return;
        }
        if self.fast.is_none() && self.slow.is_none() && self.trend.is_none() {
            return;
        }
        let mut params = match &config.strategy {
            StrategyConfig::EmaCrossMcGinley(p) => p.clone(),
            StrategyConfig::BuyAndHold => EmaCrossParams::default(),
        };
        if let Some(fast) = self.fast {
            params.fast_period = fast;
        }
        if let Some(slow) = self.slow {
            params.slow_period = slow;
        }
        if let Some(trend) = self.trend {
            params.trend_period = trend;
        }
        config.strategy = StrategyConfig::EmaCrossMcGinley(params);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            csv,
            name,
            overrides,
            out,
        } => run_cmd(config, csv, name, &overrides, &out),
        Commands::Demo {
            bars,
            seed,
            overrides,
            out,
        } => demo_cmd(bars, seed, &overrides, out.as_deref()),
        Commands::InitConfig { path, force } => init_config_cmd(&path, force),
    }
}

fn run_cmd(
    config_path: Option<PathBuf>,
    csv: Option<PathBuf>,
    name: Option<String>,
    overrides: &Overrides,
    out: &Path,
) -> Result<()> {
    let (mut config, base_dir) = match (config_path, csv) {
        (Some(path), None) => {
            let config = RunConfig::from_file(&path)?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (config, base)
        }
        (None, Some(csv)) => {
            let name = match name {
                Some(n) => n,
                None => csv
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .context("cannot derive a dataset name from --csv; pass --name")?,
            };
            let config = RunConfig {
                account: Default::default(),
                strategy: Default::default(),
                datasets: vec![DatasetConfig::csv(name, csv)],
            };
            (config, PathBuf::new())
        }
        _ => bail!("one of --config or --csv is required"),
    };

    overrides.apply(&mut config);
    execute(&config, &base_dir, Some(out))
}

fn demo_cmd(bars: usize, seed: u64, overrides: &Overrides, out: Option<&Path>) -> Result<()> {
    let mut config = RunConfig {
        account: Default::default(),
        strategy: Default::default(),
        datasets: vec![DatasetConfig::synthetic(
            "demo",
            SyntheticSpec {
                bars,
                seed,
                ..SyntheticSpec::default()
            },
        )],
    };
    overrides.apply(&mut config);
    execute(&config, Path::new("."), out)
}

fn init_config_cmd(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    let text = RunConfig::sample().to_toml()?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote sample config to {}", path.display());
    Ok(())
}

/// Run every dataset, print summaries, save artifacts.
///
/// Fails if any dataset failed, after reporting the ones that succeeded.
fn execute(config: &RunConfig, base_dir: &Path, out: Option<&Path>) -> Result<()> {
    let results = run_config(config, base_dir)?;

    let mut reports: Vec<&DatasetReport> = Vec::new();
    let mut failed = 0usize;
    for result in &results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                failed += 1;
                eprintln!("Error: {e}");
            }
        }
    }

    for report in &reports {
        println!("{}", render_summary(report));
        if let Some(out) = out {
            let dir = save_artifacts(report, out)?;
            info!(dataset = %report.dataset, dir = %dir.display(), "artifacts saved");
            println!("Artifacts saved to: {}", dir.display());
        }
    }
    if reports.len() > 1 {
        println!("{}", render_batch_table(&reports));
    }

    if failed > 0 {
        warn!(failed, total = results.len(), "batch finished with failures");
        bail!("{failed} of {} dataset(s) failed", results.len());
    }
    Ok(())
}
