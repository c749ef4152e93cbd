use chrono::{DateTime, Utc};
use tracing::warn;

use common::{Bar, BarStatus, Direction, SeriesSet, Timeframe, TrendStatus};

use crate::phase;

/// As-of state of one context timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextReading {
    pub status: TrendStatus,
    pub run_length: u32,
    /// Absolute momentum distance of the latest bar from its reference bar.
    pub deviation: f64,
    /// Absolute momentum swing of the timeframe's latest segment.
    pub phase_range: f64,
}

/// Readings for every context timeframe; `None` where history was too short.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextReadings {
    pub long: Option<ContextReading>,
    pub medium: Option<ContextReading>,
    pub correlated: Option<ContextReading>,
}

impl ContextReadings {
    /// Read every context timeframe of `series` as of `as_of`.
    pub fn read(series: &SeriesSet, as_of: DateTime<Utc>) -> Self {
        let read = |timeframe: Timeframe| {
            let reading = read_context(series.get(timeframe).as_of(as_of));
            if reading.is_none() {
                warn!(%timeframe, %as_of, "Context timeframe skipped, not enough history");
            }
            reading
        };
        Self {
            long: read(Timeframe::Long),
            medium: read(Timeframe::Medium),
            correlated: read(Timeframe::Correlated),
        }
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&ContextReading> {
        match timeframe {
            Timeframe::Primary => None,
            Timeframe::Long => self.long.as_ref(),
            Timeframe::Medium => self.medium.as_ref(),
            Timeframe::Correlated => self.correlated.as_ref(),
        }
    }
}

/// Derive a context reading from bars already cut at the primary timestamp.
///
/// Needs at least two bars and a located segment.
pub fn read_context(bars: &[Bar]) -> Option<ContextReading> {
    let [.., prev, latest] = bars else {
        return None;
    };
    let phase = phase::locate(bars)?;
    let phase_range = phase.momentum_range().abs();

    let reading = if latest.status.is_shake() {
        ContextReading {
            status: TrendStatus::Transitional {
                prior: phase.end.status,
                current: BarStatus::Shake,
            },
            run_length: phase.end.run_length,
            deviation: (latest.momentum - phase.end.momentum).abs(),
            phase_range,
        }
    } else {
        ContextReading {
            status: TrendStatus::Simple(latest.status),
            run_length: latest.run_length,
            deviation: (latest.momentum - prev.momentum).abs(),
            phase_range,
        }
    };
    Some(reading)
}

/// One unit of caution when a context timeframe opposes the primary
/// direction. Transitional statuses count by the direction they held before
/// consolidating.
pub fn contribution(primary: Direction, status: &TrendStatus) -> u8 {
    match status.effective_direction() {
        Some(context) if context.opposes(primary) => 1,
        _ => 0,
    }
}

/// Sum of contributions over the context timeframes, in `0..=3`.
/// Skipped timeframes contribute nothing.
pub fn position_score(primary: Direction, readings: &ContextReadings) -> u8 {
    Timeframe::CONTEXT
        .iter()
        .filter_map(|tf| readings.get(*tf))
        .map(|r| contribution(primary, &r.status))
        .sum()
}
