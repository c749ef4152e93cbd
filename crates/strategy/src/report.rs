use common::{SourceKind, Timeframe, TimeframeSnapshot, TradeEvent};

use crate::timing::TimingEstimate;

pub const SEPARATOR: &str = "----------------------------------------";

/// Identity of the instrument a report block is about.
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub symbol: String,
    pub source_kind: SourceKind,
    pub correlated_symbol: String,
}

impl ReportHeader {
    fn label(&self, timeframe: Timeframe) -> String {
        let interval = self.source_kind.interval(timeframe);
        match timeframe {
            Timeframe::Correlated => format!("{timeframe} {} {interval}", self.correlated_symbol),
            _ => format!("{timeframe} {interval}"),
        }
    }
}

/// Render one fired signal as report lines.
pub fn render(header: &ReportHeader, event: &TradeEvent, timing: &TimingEstimate) -> Vec<String> {
    let mut lines = Vec::with_capacity(8);
    lines.push(format!(
        "[{}, {}, {}]",
        header.symbol,
        event.timestamp.to_rfc3339(),
        event.kind
    ));
    for timeframe in Timeframe::ALL {
        let label = header.label(timeframe);
        lines.push(match event.snapshot(timeframe) {
            Some(snapshot) => snapshot_line(&label, snapshot),
            None => format!("{label}: unavailable"),
        });
    }
    lines.push(timing_line(timing));
    lines.push(format!("position {}/3", event.position_score));
    lines.push(SEPARATOR.to_string());
    lines
}

fn snapshot_line(label: &str, snapshot: &TimeframeSnapshot) -> String {
    format!(
        "{label}: status {}, run {}, phase range {:.6}, deviation {}%",
        snapshot.status,
        snapshot.run_length,
        snapshot.phase_momentum_range,
        snapshot.momentum_deviation_percent
    )
}

fn timing_line(timing: &TimingEstimate) -> String {
    match timing.session {
        Some(session) => format!(
            "session remaining {} min, next signal in {}-{} min, mode {}",
            session.remaining_minutes(),
            timing.lower_minutes,
            timing.upper_minutes,
            session.mode
        ),
        None => format!(
            "next signal in {}-{} min",
            timing.lower_minutes, timing.upper_minutes
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ts;
    use crate::timing::estimate;
    use common::{BarStatus, SignalKind, TrendStatus};

    fn event() -> TradeEvent {
        TradeEvent {
            timestamp: ts(0),
            kind: SignalKind::NormalSell,
            primary: TimeframeSnapshot {
                status: TrendStatus::Simple(BarStatus::Up),
                phase_momentum_range: 0.5,
                momentum_deviation_percent: 20,
                run_length: 6,
            },
            long: None,
            medium: Some(TimeframeSnapshot {
                status: TrendStatus::Transitional {
                    prior: BarStatus::Down,
                    current: BarStatus::Shake,
                },
                phase_momentum_range: 1.25,
                momentum_deviation_percent: 0,
                run_length: 3,
            }),
            correlated: None,
            position_score: 1,
        }
    }

    fn header(source_kind: SourceKind) -> ReportHeader {
        ReportHeader {
            symbol: "600519".into(),
            source_kind,
            correlated_symbol: "sh".into(),
        }
    }

    #[test]
    fn renders_full_block() {
        let lines = render(
            &header(SourceKind::Equity),
            &event(),
            &estimate(6, 5, Some(3600)),
        );
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "[600519, 2024-03-04T01:30:00+00:00, normal-sell]");
        assert_eq!(
            lines[1],
            "primary 5m: status up, run 6, phase range 0.500000, deviation 20%"
        );
        assert_eq!(lines[2], "long 1d: unavailable");
        assert_eq!(
            lines[3],
            "medium 30m: status down-shake, run 3, phase range 1.250000, deviation 0%"
        );
        assert_eq!(lines[4], "correlated sh 30m: unavailable");
        assert_eq!(
            lines[5],
            "session remaining 60 min, next signal in 25-35 min, mode same-session"
        );
        assert_eq!(lines[6], "position 1/3");
        assert_eq!(lines[7], SEPARATOR);
    }

    #[test]
    fn continuous_market_reports_window_only() {
        let lines = render(
            &header(SourceKind::PerpetualSwap),
            &event(),
            &estimate(6, 5, None),
        );
        assert_eq!(lines[2], "long 4h: unavailable");
        assert_eq!(lines[5], "next signal in 25-35 min");
    }
}
