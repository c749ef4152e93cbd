use chrono::{DateTime, Duration, Timelike, Utc};

use common::{Interval, SessionCalendar, SourceKind};

/// Equity exchange local time is UTC+8.
const EXCHANGE_OFFSET_HOURS: i64 = 8;

/// Trading sessions as (open, close) seconds from local midnight.
const SESSIONS: [(i64, i64); 2] = [
    (9 * 3600 + 30 * 60, 11 * 3600 + 30 * 60),
    (13 * 3600, 15 * 3600),
];

/// Session calendar for the configured market.
///
/// Equity trades two sessions a day around a lunch break; perpetual swaps
/// trade continuously and have no session bound.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeCalendar {
    source_kind: SourceKind,
}

impl ExchangeCalendar {
    pub fn new(source_kind: SourceKind) -> Self {
        Self { source_kind }
    }
}

impl SessionCalendar for ExchangeCalendar {
    fn remaining_session_seconds(&self, timestamp: DateTime<Utc>) -> Option<i64> {
        if !self.source_kind.is_session_based() {
            return None;
        }
        let local = timestamp + Duration::hours(EXCHANGE_OFFSET_HOURS);
        let now = i64::from(local.time().num_seconds_from_midnight());
        let remaining = SESSIONS
            .iter()
            .map(|&(open, close)| close - now.clamp(open, close))
            .sum();
        Some(remaining)
    }

    fn should_pull(&self, last: DateTime<Utc>, interval: Interval, now: DateTime<Utc>) -> bool {
        now - last >= interval.duration()
    }
}
