//! Bar builders shared by unit tests.

use super::Bar;
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap()
}

/// A bar `minutes` after [`base_time`] with a tight range around `close`.
pub fn bar_at_minute(minutes: i64, close: f64) -> Bar {
    Bar::new(
        base_time() + Duration::minutes(minutes),
        close,
        close * 1.01,
        close * 0.99,
        close,
        1_000.0,
    )
}

/// Synthetic 15-minute bars: open = previous close, range 1% around the body.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base_time() + Duration::minutes(15 * i as i64),
                open,
                open.max(close) * 1.01,
                open.min(close) * 0.99,
                close,
                1_000.0,
            )
        })
        .collect()
}
