use tracing::info;

use common::{Bar, Direction, PhaseBoundary, SignalKind, TimeframeSnapshot, TradeEvent, TrendStatus};

use crate::fusion::{position_score, ContextReading, ContextReadings};

/// Classify a fired signal from the pre-consolidation direction.
///
/// Divergence inverts the label the direction alone would suggest.
pub fn classify_signal(pre_direction: Direction, divergent: bool) -> SignalKind {
    match (pre_direction, divergent) {
        (Direction::Up, true) => SignalKind::DivergenceBuy,
        (Direction::Up, false) => SignalKind::NormalSell,
        (Direction::Down, true) => SignalKind::DivergenceSell,
        (Direction::Down, false) => SignalKind::NormalBuy,
    }
}

/// Deviation as a percentage of the segment swing, ties rounded to even.
/// A zero swing reports 0%.
pub fn deviation_percent(deviation: f64, phase_range: f64) -> i64 {
    if phase_range == 0.0 {
        return 0;
    }
    (100.0 * deviation / phase_range).round_ties_even() as i64
}

/// Direction the primary timeframe held before the signal: the segment end
/// while still shaking, the segment start once a new bar has resolved it.
pub fn pre_direction(now: &Bar, phase: &PhaseBoundary) -> Option<Direction> {
    if now.status.is_shake() {
        phase.end.status.direction()
    } else {
        phase.start.status.direction()
    }
}

/// Build the trade event for a signal fired on `now`.
pub fn build_event(
    now: &Bar,
    phase: &PhaseBoundary,
    divergent: bool,
    context: &ContextReadings,
) -> Option<TradeEvent> {
    let pre = pre_direction(now, phase)?;
    let phase_range = phase.momentum_range().abs();
    let deviation = (now.momentum - phase.end.momentum).abs();

    let primary = TimeframeSnapshot {
        status: TrendStatus::Simple(pre.into()),
        phase_momentum_range: phase_range,
        momentum_deviation_percent: deviation_percent(deviation, phase_range),
        run_length: phase.end.run_length,
    };

    Some(TradeEvent {
        timestamp: now.timestamp,
        kind: classify_signal(pre, divergent),
        primary,
        long: context.long.as_ref().map(snapshot),
        medium: context.medium.as_ref().map(snapshot),
        correlated: context.correlated.as_ref().map(snapshot),
        position_score: position_score(pre, context),
    })
}

fn snapshot(reading: &ContextReading) -> TimeframeSnapshot {
    TimeframeSnapshot {
        status: reading.status,
        phase_momentum_range: reading.phase_range,
        momentum_deviation_percent: deviation_percent(reading.deviation, reading.phase_range),
        run_length: reading.run_length,
    }
}

/// Append-only log of fired trade events.
#[derive(Debug, Clone, Default)]
pub struct TradeSignalRecorder {
    log: Vec<TradeEvent>,
}

impl TradeSignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fired event. Events are never modified once logged.
    pub fn append(&mut self, event: TradeEvent) -> &TradeEvent {
        info!(
            at = %event.timestamp,
            kind = %event.kind,
            position = event.position_score,
            "Trade signal recorded"
        );
        self.log.push(event);
        &self.log[self.log.len() - 1]
    }

    pub fn events(&self) -> &[TradeEvent] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
