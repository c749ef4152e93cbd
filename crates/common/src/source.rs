use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Interval, RawBar, Result, Series, SourceKind};

/// Abstraction over where timeframe series come from.
///
/// `FileSource` in `crates/engine` implements this over JSON-lines files.
/// All data acquisition happens through this trait before the signal core
/// runs; the core itself never performs I/O.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Load and classify the full stored history of one series.
    async fn load_initial(
        &self,
        interval: Interval,
        source_kind: SourceKind,
        symbol: &str,
        factor: f64,
    ) -> Result<Series>;

    /// Fetch raw rows with `timestamp >= since`.
    ///
    /// `rewrite` is forwarded from configuration; sources that cache may use
    /// it to decide whether fetched rows are written back.
    async fn fetch_new(
        &self,
        interval: Interval,
        source_kind: SourceKind,
        since: DateTime<Utc>,
        symbol: &str,
        rewrite: bool,
    ) -> Result<Vec<RawBar>>;
}

/// Trading-session arithmetic.
pub trait SessionCalendar: Send + Sync {
    /// Seconds of trading left in the session containing `timestamp`.
    /// `None` for continuous markets.
    fn remaining_session_seconds(&self, timestamp: DateTime<Utc>) -> Option<i64>;

    /// Whether a new bar of `interval` can exist since `last`.
    fn should_pull(&self, last: DateTime<Utc>, interval: Interval, now: DateTime<Utc>) -> bool;
}

/// Consumer of rendered signal reports.
pub trait ReportSink: Send {
    fn emit(&mut self, lines: &[String]);
}
