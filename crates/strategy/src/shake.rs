use tracing::debug;

use common::{Bar, PhaseBoundary};

/// Shortest primary segment (in bars) worth trading a reversal of.
pub const DEFAULT_MIN_RUN_LENGTH: u32 = 5;

/// Outcome of one state-machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Consolidation flag to carry into the next step.
    pub in_shake: bool,
    /// A genuine regime change was detected on this bar.
    pub fired: bool,
}

impl Transition {
    fn hold(in_shake: bool) -> Self {
        Self {
            in_shake,
            fired: false,
        }
    }

    fn fire(in_shake: bool) -> Self {
        Self {
            in_shake,
            fired: true,
        }
    }
}

/// Separates genuine primary-timeframe reversals from transient noise.
///
/// States are Trending (`in_shake == false`) and Shaking. The noise band is
/// `tolerance_factor × |segment momentum swing|`, so it scales with the
/// trend being watched.
#[derive(Debug, Clone)]
pub struct ShakeDetector {
    tolerance_factor: f64,
    min_run_length: u32,
}

impl ShakeDetector {
    pub fn new(tolerance_factor: f64, min_run_length: u32) -> Self {
        Self {
            tolerance_factor,
            min_run_length,
        }
    }

    /// Noise tolerance for the current segment.
    pub fn tolerance(&self, phase: &PhaseBoundary) -> f64 {
        self.tolerance_factor * phase.momentum_range().abs()
    }

    /// Advance the state machine by one bar.
    ///
    /// `bars` is the primary series up to and including the bar being
    /// evaluated; `phase` is its boundary as located on that same prefix.
    pub fn step(&self, in_shake: bool, bars: &[Bar], phase: Option<&PhaseBoundary>) -> Transition {
        let (Some(phase), [.., prev, now]) = (phase, bars) else {
            return Transition::hold(in_shake);
        };
        let tolerance = self.tolerance(phase);

        if !in_shake {
            let entering = phase.end.run_length >= self.min_run_length
                && now.status.is_shake()
                && !prev.status.is_shake();
            if !entering {
                return Transition::hold(false);
            }
            let deviation = (now.momentum - prev.momentum).abs();
            if deviation > tolerance {
                debug!(deviation, tolerance, at = %now.timestamp, "Shake jump beyond band, reversal");
                return Transition::fire(false);
            }
            debug!(deviation, tolerance, at = %now.timestamp, "Entered shake");
            return Transition::hold(true);
        }

        if !now.status.is_shake() {
            let before = pre_shake_bar(bars);
            let reversed = now.status != before.status;
            debug!(
                now = %now.status,
                before = %before.status,
                reversed,
                at = %now.timestamp,
                "Shake resolved"
            );
            return Transition {
                in_shake: false,
                fired: reversed,
            };
        }

        let deviation = (now.momentum - phase.end.momentum).abs();
        if deviation > tolerance {
            debug!(deviation, tolerance, at = %now.timestamp, "Shake band breached");
            Transition::fire(false)
        } else {
            Transition::hold(true)
        }
    }
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::new(0.1, DEFAULT_MIN_RUN_LENGTH)
    }
}

/// Nearest non-Shake bar before the newest one, or the first bar of the
/// series when the scan runs out of history.
fn pre_shake_bar(bars: &[Bar]) -> &Bar {
    let history = &bars[..bars.len() - 1];
    history
        .iter()
        .rev()
        .find(|b| !b.status.is_shake())
        .unwrap_or(&bars[0])
}
