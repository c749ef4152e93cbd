use chrono::{DateTime, Utc};
use tracing::debug;

use common::{Bar, BarStatus, RawBar, Series};

use super::MacdIndicator;

/// Turns raw close rows into classified bars: MACD momentum, Up/Down/Shake
/// status and run lengths.
///
/// A bar is `Shake` when its momentum change is within `factor` of the
/// previous momentum's magnitude; otherwise the sign of the change decides
/// `Up` or `Down`. The first bar has no change and is always `Shake`.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    macd: MacdIndicator,
    factor: f64,
}

impl TrendClassifier {
    pub fn new(macd: MacdIndicator, factor: f64) -> Self {
        Self { macd, factor }
    }

    /// Classify a full history. Rows are sorted and de-duplicated first.
    pub fn classify(&self, rows: Vec<RawBar>) -> Series {
        let rows = normalize(rows);
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
        let momentum = self.macd.line(&closes);

        let labelled = rows.iter().zip(&momentum).enumerate().map(|(i, (row, &m))| {
            let status = if i == 0 {
                BarStatus::Shake
            } else {
                self.status_for(momentum[i - 1], m)
            };
            (row.timestamp, row.close, m, status)
        });
        Series::from_bars(label_runs(labelled))
    }

    /// Replace everything at or after `since` with `rows` and reclassify.
    ///
    /// The bar at `since` is normally the still-forming last bar of the old
    /// series, so the fresh rows supersede it.
    pub fn merge_and_classify(
        &self,
        existing: &Series,
        rows: Vec<RawBar>,
        since: DateTime<Utc>,
    ) -> Series {
        let appended = rows.len();
        let mut merged: Vec<RawBar> = existing
            .bars()
            .iter()
            .filter(|b| b.timestamp < since)
            .map(|b| RawBar {
                timestamp: b.timestamp,
                close: b.close,
            })
            .collect();
        merged.extend(rows);
        let series = self.classify(merged);
        debug!(
            appended,
            before = existing.len(),
            after = series.len(),
            "Series merged and reclassified"
        );
        series
    }

    fn status_for(&self, prev: f64, now: f64) -> BarStatus {
        let delta = now - prev;
        if delta.abs() <= self.factor * prev.abs() {
            BarStatus::Shake
        } else if delta > 0.0 {
            BarStatus::Up
        } else {
            BarStatus::Down
        }
    }
}

/// Build bars from `(timestamp, close, momentum, status)` tuples, assigning
/// run lengths: 1 on every status change, +1 while the status repeats.
pub fn label_runs<I>(rows: I) -> Vec<Bar>
where
    I: IntoIterator<Item = (DateTime<Utc>, f64, f64, BarStatus)>,
{
    let mut bars: Vec<Bar> = Vec::new();
    for (timestamp, close, momentum, status) in rows {
        let run_length = match bars.last() {
            Some(prev) if prev.status == status => prev.run_length + 1,
            _ => 1,
        };
        bars.push(Bar::new(timestamp, close, momentum, status, run_length));
    }
    bars
}

/// Sort by timestamp; for duplicate timestamps the later row wins.
fn normalize(mut rows: Vec<RawBar>) -> Vec<RawBar> {
    rows.sort_by_key(|r| r.timestamp);
    let mut out: Vec<RawBar> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(last) if last.timestamp == row.timestamp => *last = row,
            _ => out.push(row),
        }
    }
    out
}
