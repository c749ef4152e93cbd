use chrono::{DateTime, Utc};
use tracing::debug;

use common::{Bar, EngineState, Series, SeriesSet, Timeframe, TradeEvent};

use crate::fusion::ContextReadings;
use crate::shake::ShakeDetector;
use crate::{divergence, phase, recorder};

/// Result of evaluating one primary prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub state: EngineState,
    pub event: Option<TradeEvent>,
}

/// One tick of the signal pipeline, with state threaded in and out.
///
/// `primary` is the primary series up to the bar being evaluated; context
/// series are read as of that bar's timestamp only.
pub fn evaluate(
    detector: &ShakeDetector,
    state: EngineState,
    primary: &[Bar],
    context: &SeriesSet,
) -> Evaluation {
    let Some(phase) = phase::locate(primary) else {
        return Evaluation { state, event: None };
    };
    let is_divergent = divergence::detect(&phase);
    let transition = detector.step(state.in_shake, primary, Some(&phase));
    let state = EngineState {
        in_shake: transition.in_shake,
        is_divergent,
    };
    if !transition.fired {
        return Evaluation { state, event: None };
    }

    // A located phase implies at least two bars.
    let event = primary.last().and_then(|now| {
        let readings = ContextReadings::read(context, now.timestamp);
        recorder::build_event(now, &phase, is_divergent, &readings)
    });
    Evaluation { state, event }
}

/// Shortest prefix length of `bars` for which a segment can be located.
pub fn first_replay_prefix(bars: &[Bar]) -> Option<usize> {
    (2..=bars.len()).find(|&len| phase::locate(&bars[..len]).is_some())
}

/// Per-instrument signal engine: the series set, carried state and the
/// trade log.
///
/// Every primary bar is evaluated exactly once, in order: each call to
/// [`SignalEngine::tick`] walks forward through all prefixes newer than the
/// last one evaluated, so the consolidation flag never skips a bar.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    detector: ShakeDetector,
    state: EngineState,
    series: SeriesSet,
    recorder: recorder::TradeSignalRecorder,
    /// Timestamp of the newest primary bar already evaluated.
    cursor: Option<DateTime<Utc>>,
}

impl SignalEngine {
    pub fn new(detector: ShakeDetector, series: SeriesSet) -> Self {
        Self {
            detector,
            state: EngineState::default(),
            series,
            recorder: recorder::TradeSignalRecorder::new(),
            cursor: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn series(&self) -> &SeriesSet {
        &self.series
    }

    pub fn replace_series(&mut self, timeframe: Timeframe, series: Series) {
        self.series.replace(timeframe, series);
    }

    /// Every trade event fired so far, oldest first.
    pub fn events(&self) -> &[TradeEvent] {
        self.recorder.events()
    }

    /// Evaluate all primary bars that arrived since the previous tick.
    /// Returns the events fired by this tick.
    pub fn tick(&mut self) -> &[TradeEvent] {
        let first_new = self.recorder.len();
        let start = match self.cursor {
            Some(cursor) => self.series.primary.as_of(cursor).len() + 1,
            None => 1,
        };
        self.advance(start);
        &self.recorder.events()[first_new..]
    }

    /// Re-run the pipeline over the whole primary history from a clean
    /// state, one prefix at a time. Returns the events fired by the replay.
    pub fn replay(&mut self) -> Vec<TradeEvent> {
        let first_new = self.recorder.len();
        self.state = EngineState::default();
        self.cursor = None;
        if let Some(start) = first_replay_prefix(self.series.primary.bars()) {
            debug!(start, len = self.series.primary.len(), "Replaying primary history");
            self.advance(start);
        }
        self.recorder.events()[first_new..].to_vec()
    }

    fn advance(&mut self, start: usize) {
        let len = self.series.primary.len();
        for prefix in start.max(1)..=len {
            let bars = self.series.primary.prefix(prefix);
            let evaluation = evaluate(&self.detector, self.state, bars, &self.series);
            self.cursor = bars.last().map(|b| b.timestamp);
            self.state = evaluation.state;
            if let Some(event) = evaluation.event {
                self.recorder.append(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars, spaced};
    use common::BarStatus::{self, Down, Shake, Up};
    use common::SignalKind;

    fn primary(shape: &[(BarStatus, f64)]) -> SeriesSet {
        SeriesSet {
            primary: Series::from_bars(bars(shape)),
            ..Default::default()
        }
    }

    fn up_run() -> Vec<(BarStatus, f64)> {
        (0..6).map(|i| (Up, i as f64)).collect()
    }

    #[test]
    fn scenario_a_large_jump_fires_immediately() {
        let mut shape = up_run();
        shape.push((Shake, 6.0));
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        let fired = engine.tick().to_vec();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, SignalKind::NormalSell);
        assert!(!engine.state().in_shake);
    }

    #[test]
    fn scenario_b_small_jump_enters_shake() {
        let mut shape = up_run();
        shape.push((Shake, 5.2));
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        assert!(engine.tick().is_empty());
        assert!(engine.state().in_shake);
    }

    #[test]
    fn scenario_c_reversal_after_shake_fires() {
        let mut shape = up_run();
        shape.extend([(Shake, 5.2), (Shake, 5.1), (Down, 4.8)]);
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        let fired = engine.tick().to_vec();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].timestamp, engine.series().primary.latest().unwrap().timestamp);
        assert!(!engine.state().in_shake);
    }

    #[test]
    fn scenario_d_same_direction_resolves_silently() {
        let mut shape: Vec<_> = (0..6).map(|i| (Down, -(i as f64))).collect();
        shape.extend([(Shake, -5.2), (Shake, -5.1), (Down, -5.4)]);
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        assert!(engine.tick().is_empty());
        assert!(!engine.state().in_shake);
    }

    #[test]
    fn divergence_flips_signal_kind() {
        // Closes rise while momentum falls across the Up segment.
        let mut shape: Vec<_> = (0..6).map(|i| (Up, 10.0 - i as f64)).collect();
        shape.push((Shake, 3.0));
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        let fired = engine.tick().to_vec();
        assert_eq!(fired[0].kind, SignalKind::DivergenceBuy);
        assert!(engine.state().is_divergent);
    }

    #[test]
    fn mixed_direction_segment_sets_tolerance_from_its_first_bar() {
        // Down then Up with no Shake between: one segment from momentum 0.0
        // to 4.0, so the band is 0.4 rather than the Up run's 0.5.
        let mut shape = vec![(Down, 0.0), (Down, -1.0), (Down, -2.0)];
        shape.extend((0..6).map(|i| (Up, i as f64 - 1.0)));
        shape.push((Shake, 4.45));
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        let fired = engine.tick().to_vec();
        assert_eq!(fired.len(), 1);
        let event = &fired[0];
        assert_eq!(event.kind, SignalKind::NormalSell);
        assert_eq!(event.primary.status, common::TrendStatus::Simple(Up));
        assert_eq!(event.primary.phase_momentum_range, 4.0);
        assert_eq!(event.primary.run_length, 6);
        assert_eq!(event.primary.momentum_deviation_percent, 11);
        assert!(!engine.state().in_shake);
    }

    #[test]
    fn tick_only_evaluates_new_bars() {
        let mut shape = up_run();
        shape.push((Shake, 6.0));
        let mut engine = SignalEngine::new(ShakeDetector::default(), primary(&shape));
        assert_eq!(engine.tick().len(), 1);
        assert!(engine.tick().is_empty());
        assert_eq!(engine.events().len(), 1);
    }

    #[test]
    fn context_feeds_position_score() {
        let mut shape = up_run();
        shape.push((Shake, 6.0));
        let mut set = primary(&shape);
        set.long = spaced(&[(Down, -1.0), (Down, -2.0)], 3);
        set.medium = spaced(&[(Up, 1.0), (Up, 2.0)], 3);
        set.correlated = spaced(&[(Down, -1.0), (Down, -2.0), (Shake, -2.1)], 3);
        let mut engine = SignalEngine::new(ShakeDetector::default(), set);
        let event = engine.tick()[0].clone();
        assert_eq!(event.position_score, 2);
        assert!(event.long.is_some() && event.medium.is_some() && event.correlated.is_some());
    }

    #[test]
    fn replay_matches_incremental_ticks() {
        let mut shape = up_run();
        shape.extend([(Shake, 5.2), (Shake, 5.1), (Down, 4.8), (Down, 3.0)]);
        shape.extend((0..6).map(|i| (Down, 2.0 - i as f64)));
        shape.push((Shake, -1.0));
        let full = Series::from_bars(bars(&shape));

        let mut replayed = SignalEngine::new(
            ShakeDetector::default(),
            SeriesSet {
                primary: full.clone(),
                ..Default::default()
            },
        );
        let expected = replayed.replay();
        assert!(!expected.is_empty());

        let mut live = SignalEngine::new(ShakeDetector::default(), SeriesSet::default());
        for len in 1..=full.len() {
            live.replace_series(Timeframe::Primary, Series::from_bars(full.prefix(len).to_vec()));
            live.tick();
        }
        assert_eq!(live.events(), expected.as_slice());
    }

    #[test]
    fn replay_starts_at_first_locatable_prefix() {
        let series = bars(&[(Shake, 0.0), (Shake, 0.0), (Up, 1.0), (Up, 2.0)]);
        assert_eq!(first_replay_prefix(&series), Some(3));
        assert_eq!(first_replay_prefix(&series[..2]), None);
    }
}
