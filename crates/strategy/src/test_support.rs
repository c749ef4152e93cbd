use chrono::{DateTime, Duration, TimeZone, Utc};

use common::{Bar, BarStatus, Series};

use crate::indicators::label_runs;

/// Primary bar `i`, five minutes apart, starting at a session open.
pub(crate) fn ts(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 1, 30, 0).unwrap() + Duration::minutes(5 * i)
}

/// Bars from `(status, momentum)` pairs; close rises by 1 per bar.
pub(crate) fn bars(shape: &[(BarStatus, f64)]) -> Vec<Bar> {
    label_runs(
        shape.iter()
            .enumerate()
            .map(|(i, &(status, momentum))| (ts(i as i64), 100.0 + i as f64, momentum, status)),
    )
}

/// Bars from `(status, close, momentum)` triples.
pub(crate) fn priced_bars(shape: &[(BarStatus, f64, f64)]) -> Vec<Bar> {
    label_runs(
        shape.iter()
            .enumerate()
            .map(|(i, &(status, close, momentum))| (ts(i as i64), close, momentum, status)),
    )
}

/// Context bars spaced `step` primary bars apart.
pub(crate) fn spaced(shape: &[(BarStatus, f64)], step: i64) -> Series {
    Series::from_bars(label_runs(shape.iter().enumerate().map(
        |(i, &(status, momentum))| (ts(i as i64 * step), 100.0, momentum, status),
    )))
}
