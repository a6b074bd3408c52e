//! Bar loading for the runner.
//!
//! Two sources:
//! 1. A CSV file of OHLCV bars (the layout market-data downloaders write:
//!    `Datetime,Open,High,Low,Close,Adj Close,Volume`, header case ignored)
//! 2. A deterministic synthetic random walk, seeded from the dataset name
//!
//! Rows with an empty price field are skipped and counted; every other
//! malformed row is an error. The resulting bars go through
//! [`PriceSeries::load`], so ordering and price checks live in one place.

use barlab_core::domain::{Bar, PriceSeries, SeriesError};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::StringRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DatasetConfig, DatasetSource, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: CSV error: {source}")]
    Csv {
        label: String,
        #[source]
        source: csv::Error,
    },

    #[error("{label}: missing column '{column}'")]
    MissingColumn { label: String, column: &'static str },

    #[error("{label}: line {line}: cannot parse timestamp '{value}'")]
    Timestamp {
        label: String,
        line: u64,
        value: String,
    },

    #[error("{label}: line {line}: cannot parse {column} value '{value}'")]
    Number {
        label: String,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("{label}: {source}")]
    Series {
        label: String,
        #[source]
        source: SeriesError,
    },

    #[error("invalid dataset: {0}")]
    Config(#[from] crate::config::ConfigError),
}

const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "datetime", "date", "time"];

/// Header positions of the columns we read.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, label: &str) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| {
            find(name).ok_or_else(|| LoadError::MissingColumn {
                label: label.to_string(),
                column: name,
            })
        };

        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or_else(|| LoadError::MissingColumn {
                label: label.to_string(),
                column: "timestamp",
            })?;

        Ok(Self {
            timestamp,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

/// Load a dataset described by the run config.
///
/// Relative CSV paths resolve against `base_dir` (the config file's folder).
pub fn load_dataset(dataset: &DatasetConfig, base_dir: &Path) -> Result<PriceSeries, LoadError> {
    match dataset.source()? {
        DatasetSource::Csv(path) => {
            let full = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
            load_csv(&full)
        }
        DatasetSource::Synthetic(spec) => generate_synthetic(&dataset.name, spec),
    }
}

/// Load bars from a CSV file.
pub fn load_csv(path: &Path) -> Result<PriceSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_csv_from_reader(file, &path.display().to_string())
}

/// Load bars from any CSV reader. `label` names the source in errors.
pub fn load_csv_from_reader<R: Read>(reader: R, label: &str) -> Result<PriceSeries, LoadError> {
    let csv_err = |source| LoadError::Csv {
        label: label.to_string(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let cols = Columns::resolve(&headers, label)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let prices = [cols.open, cols.high, cols.low, cols.close];
        if prices.iter().any(|&i| record.get(i).unwrap_or("").is_empty()) {
            skipped += 1;
            continue;
        }

        let raw_ts = record.get(cols.timestamp).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            label: label.to_string(),
            line,
            value: raw_ts.to_string(),
        })?;

        let number = |idx: usize, column: &'static str| {
            let raw = record.get(idx).unwrap_or("");
            raw.parse::<f64>().map_err(|_| LoadError::Number {
                label: label.to_string(),
                line,
                column,
                value: raw.to_string(),
            })
        };
        let volume = match cols.volume {
            Some(idx) if !record.get(idx).unwrap_or("").is_empty() => number(idx, "volume")?,
            _ => 0.0,
        };

        bars.push(Bar::new(
            timestamp,
            number(cols.open, "open")?,
            number(cols.high, "high")?,
            number(cols.low, "low")?,
            number(cols.close, "close")?,
            volume,
        ));
    }

    if skipped > 0 {
        warn!(source = label, skipped, "skipped rows with missing prices");
    }
    debug!(source = label, bars = bars.len(), "csv loaded");

    PriceSeries::load(bars).map_err(|source| LoadError::Series {
        label: label.to_string(),
        source,
    })
}

/// Parse the timestamp layouts downloaders commonly emit.
///
/// Offsets are honoured and converted to UTC; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&ts));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| Utc.from_utc_datetime(&ts))
}

/// Generate a deterministic random walk.
///
/// The RNG seed mixes the dataset name with `spec.seed`, so two datasets with
/// the same parameters still get different paths.
pub fn generate_synthetic(name: &str, spec: &SyntheticSpec) -> Result<PriceSeries, LoadError> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(&spec.seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).single().unwrap_or_default();
    let step = Duration::minutes(spec.interval_minutes);
    let max_step = spec.max_step;

    let mut bars = Vec::with_capacity(spec.bars);
    let mut price = spec.start_price;
    for i in 0..spec.bars {
        let ret: f64 = if max_step > 0.0 {
            rng.gen_range(-max_step..max_step)
        } else {
            0.0
        };
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..=max_step / 2.0));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..=max_step / 2.0));
        let volume = rng.gen_range(100.0..10_000.0_f64).round();

        bars.push(Bar::new(
            start + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }

    PriceSeries::load(bars).map_err(|source| LoadError::Series {
        label: name.to_string(),
        source,
    })
}

/// Deterministic BLAKE3 hash over every bar of a series.
pub fn dataset_hash(series: &PriceSeries) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in series.bars() {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
