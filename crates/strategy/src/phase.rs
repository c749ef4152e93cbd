use common::{Bar, PhaseBoundary};

/// Locate the latest contiguous non-Shake segment of a series.
///
/// `end` is the newest non-Shake bar; `start` is the earliest bar of the
/// unbroken non-Shake block ending there. Returns `None` while the series is
/// shorter than two bars or has never left Shake.
pub fn locate(bars: &[Bar]) -> Option<PhaseBoundary> {
    if bars.len() < 2 {
        return None;
    }
    let end = bars.iter().rposition(|b| !b.status.is_shake())?;
    let start = bars[..end]
        .iter()
        .rposition(|b| b.status.is_shake())
        .map_or(0, |shake| shake + 1);
    Some(PhaseBoundary {
        start: bars[start],
        end: bars[end],
    })
}
