//! End-to-end: config file -> CSV/synthetic loading -> batch run -> artifacts.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use barlab_core::strategy::{EmaCrossParams, StrategyConfig};
use barlab_runner::{
    load_artifacts, load_csv, load_dataset, run_batch, run_config, run_dataset, save_artifacts,
    DatasetConfig, RunConfig, RunError, SyntheticSpec,
};

/// Writes a 15-minute CSV in the layout downloaders emit, with one
/// empty-price row in the middle.
fn write_csv(path: &Path, bars: usize) {
    let mut out = String::from("Datetime,Open,High,Low,Close,Adj Close,Volume\n");
    let mut price = 100.0_f64;
    for i in 0..bars {
        let minutes = 15 + i * 15;
        let (h, m) = (9 + minutes / 60, minutes % 60);
        let day = 2 + h / 24;
        let h = h % 24;
        let step = if (i / 7) % 2 == 0 { 1.004 } else { 0.996 };
        let close = price * step;
        let _ = writeln!(
            out,
            "2024-01-{day:02} {h:02}:{m:02}:00+05:30,{price:.4},{:.4},{:.4},{close:.4},{close:.4},{}",
            price.max(close) * 1.001,
            price.min(close) * 0.999,
            1000 + i
        );
        if i == bars / 2 {
            let _ = writeln!(out, "2024-01-{day:02} {h:02}:{m:02}:30+05:30,,,,,,");
        }
        price = close;
    }
    std::fs::write(path, out).unwrap();
}

fn small_strategy() -> StrategyConfig {
    StrategyConfig::EmaCrossMcGinley(EmaCrossParams {
        fast_period: 5,
        slow_period: 20,
        trend_period: 8,
    })
}

#[test]
fn csv_file_loads_and_skips_empty_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("itc.csv");
    write_csv(&path, 60);

    let series = load_csv(&path).unwrap();
    assert_eq!(series.len(), 60);
    // 09:15 IST is 03:45 UTC.
    assert_eq!(series.first().timestamp.to_rfc3339(), "2024-01-02T03:45:00+00:00");
}

#[test]
fn config_file_to_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(&dir.path().join("itc.csv"), 300);
    let config_path = dir.path().join("barlab.toml");
    std::fs::write(
        &config_path,
        r#"
[account]
starting_cash = 10000.0
commission_rate = 0.002

[strategy]
type = "EMA_CROSS_MCGINLEY"
fast_period = 5
slow_period = 20
trend_period = 8

[[datasets]]
name = "ITC.NS"
path = "itc.csv"

[[datasets]]
name = "walk"
[datasets.synthetic]
bars = 300
seed = 11
"#,
    )
    .unwrap();

    let config = RunConfig::from_file(&config_path).unwrap();
    let reports: Vec<_> = run_config(&config, dir.path())
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].dataset, "ITC.NS");
    assert_eq!(reports[0].result.warmup_bars, 19);
    assert_eq!(reports[0].result.bars_processed, 300 - 19);

    let out = dir.path().join("out");
    for report in &reports {
        let run_dir = save_artifacts(report, &out).unwrap();
        for file in ["result.json", "trades.csv", "equity.csv", "summary.md"] {
            assert!(run_dir.join(file).exists(), "missing {file}");
        }
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(&loaded, report);

        let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), report.result.bars_processed + 1);
        let summary = std::fs::read_to_string(run_dir.join("summary.md")).unwrap();
        assert!(summary.contains(&report.dataset));
    }
    assert!(out.join("ITC.NS").is_dir());
}

#[test]
fn batch_matches_sequential_runs() {
    let config = RunConfig {
        account: Default::default(),
        strategy: small_strategy(),
        datasets: (0..4)
            .map(|i| {
                DatasetConfig::synthetic(
                    format!("walk-{i}"),
                    SyntheticSpec {
                        bars: 500,
                        seed: i,
                        ..SyntheticSpec::default()
                    },
                )
            })
            .collect(),
    };

    let batch: Vec<_> = run_batch(&config, Path::new("."))
        .into_iter()
        .map(Result::unwrap)
        .collect();

    for (ds, report) in config.datasets.iter().zip(&batch) {
        let series = load_dataset(ds, Path::new(".")).unwrap();
        let sequential = run_dataset(&config, &ds.name, Arc::new(series)).unwrap();
        assert_eq!(&sequential, report);
        assert_eq!(
            sequential.result.fingerprint(),
            report.result.fingerprint()
        );
    }
}

#[test]
fn invalid_config_rejected_before_running() {
    let config = RunConfig {
        account: Default::default(),
        strategy: small_strategy(),
        datasets: vec![],
    };
    let err = run_config(&config, Path::new(".")).unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
}

#[test]
fn malformed_csv_reports_dataset_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("bad.csv"),
        "Datetime,Open,High,Low,Close,Volume\nnot-a-date,1,1,1,1,1\n",
    )
    .unwrap();
    let config = RunConfig {
        account: Default::default(),
        strategy: small_strategy(),
        datasets: vec![DatasetConfig::csv("bad", "bad.csv")],
    };
    let results = run_batch(&config, dir.path());
    let err = results[0].as_ref().unwrap_err();
    assert!(err.to_string().contains("'bad'"));
    assert!(matches!(err, RunError::Load { .. }));
}
