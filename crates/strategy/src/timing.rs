use common::TradingMode;

/// Session outlook for session-based markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutlook {
    pub remaining_seconds: i64,
    pub mode: TradingMode,
}

impl SessionOutlook {
    /// Whole minutes left, ties rounded to even.
    pub fn remaining_minutes(&self) -> i64 {
        (self.remaining_seconds as f64 / 60.0).round_ties_even() as i64
    }
}

/// Expected window until the next signal, assuming the next primary segment
/// is about as long as the one that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingEstimate {
    pub lower_minutes: i64,
    pub upper_minutes: i64,
    /// `None` for continuous markets.
    pub session: Option<SessionOutlook>,
}

/// `run_length` is the primary segment length in bars, `bar_minutes` the
/// primary bar duration, `remaining_seconds` the time left in the session.
pub fn estimate(run_length: u32, bar_minutes: i64, remaining_seconds: Option<i64>) -> TimingEstimate {
    let run = i64::from(run_length);
    let lower_minutes = (run - 1) * bar_minutes;
    let upper_minutes = (run + 1) * bar_minutes;
    let session = remaining_seconds.map(|remaining_seconds| SessionOutlook {
        remaining_seconds,
        mode: if remaining_seconds >= upper_minutes * 60 {
            TradingMode::SameSession
        } else {
            TradingMode::NextSession
        },
    });
    TimingEstimate {
        lower_minutes,
        upper_minutes,
        session,
    }
}
