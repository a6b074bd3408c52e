//! Criterion benchmarks for BarLab hot paths.
//!
//! Benchmarks:
//! 1. Full backtest (indicator binding + bar loop) for the EMA cross strategy
//! 2. Indicator transforms (exponential and adaptive smoothing)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use barlab_core::domain::{Bar, PriceSeries};
use barlab_core::engine::{Backtest, BacktestConfig};
use barlab_core::indicators::{adaptive_smoothing, exponential_smoothing};
use barlab_core::strategy::{EmaCrossMcGinley, EmaCrossParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 10.0 + (i as f64 * 0.011).cos() * 4.0;
            Bar::new(
                start + Duration::minutes(15 * i as i64),
                close - 0.2,
                close + 1.0,
                close - 1.0,
                close,
                1_000.0 + (i % 500) as f64,
            )
        })
        .collect()
}

// ── Bar loop ─────────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");

    for &n in &[1_000usize, 10_000] {
        let series = Arc::new(PriceSeries::load(make_bars(n)).unwrap());
        let backtest = Backtest::new(series, BacktestConfig::default());
        group.bench_with_input(BenchmarkId::new("ema_cross_mcginley", n), &n, |b, _| {
            b.iter(|| {
                let mut strategy = EmaCrossMcGinley::new(EmaCrossParams::default());
                black_box(backtest.run(&mut strategy).unwrap())
            });
        });
    }

    group.finish();
}

// ── Indicators ───────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_transform");
    let closes: Vec<f64> = make_bars(10_000).iter().map(|b| b.close).collect();

    group.bench_function("exponential_smoothing_101", |b| {
        b.iter(|| black_box(exponential_smoothing(black_box(&closes), 101)));
    });
    group.bench_function("adaptive_smoothing_21", |b| {
        b.iter(|| black_box(adaptive_smoothing(black_box(&closes), 21)));
    });

    group.finish();
}

criterion_group!(benches, bench_backtest, bench_indicators);
criterion_main!(benches);
