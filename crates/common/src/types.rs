use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Per-bar trend classification assigned by the trend classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarStatus {
    Up,
    Down,
    /// Consolidation: momentum oscillates without a directional run.
    Shake,
}

impl BarStatus {
    pub fn is_shake(self) -> bool {
        matches!(self, BarStatus::Shake)
    }

    /// The trend direction of this status, `None` for `Shake`.
    pub fn direction(self) -> Option<Direction> {
        match self {
            BarStatus::Up => Some(Direction::Up),
            BarStatus::Down => Some(Direction::Down),
            BarStatus::Shake => None,
        }
    }
}

impl std::fmt::Display for BarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarStatus::Up => write!(f, "up"),
            BarStatus::Down => write!(f, "down"),
            BarStatus::Shake => write!(f, "shake"),
        }
    }
}

/// A directional trend, i.e. a non-Shake status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposes(self, other: Direction) -> bool {
        self != other
    }
}

impl From<Direction> for BarStatus {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => BarStatus::Up,
            Direction::Down => BarStatus::Down,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        BarStatus::from(*self).fmt(f)
    }
}

/// Status of a timeframe as reported in a trade snapshot.
///
/// `Transitional` means "was trending `prior`, now `current`" (in practice
/// always a Shake following a directional run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStatus {
    Simple(BarStatus),
    Transitional { prior: BarStatus, current: BarStatus },
}

impl TrendStatus {
    /// The status held before any current consolidation: the first component.
    pub fn effective(&self) -> BarStatus {
        match self {
            TrendStatus::Simple(status) => *status,
            TrendStatus::Transitional { prior, .. } => *prior,
        }
    }

    pub fn effective_direction(&self) -> Option<Direction> {
        self.effective().direction()
    }
}

impl std::fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendStatus::Simple(status) => write!(f, "{status}"),
            TrendStatus::Transitional { prior, current } => write!(f, "{prior}-{current}"),
        }
    }
}

/// One classified row of a timeframe series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// MACD line value at this bar.
    pub momentum: f64,
    pub status: BarStatus,
    /// Consecutive bars sharing `status`, 1 on the first bar of a run.
    pub run_length: u32,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        close: f64,
        momentum: f64,
        status: BarStatus,
        run_length: u32,
    ) -> Self {
        Self {
            timestamp,
            close,
            momentum,
            status,
            run_length,
        }
    }
}

/// Unclassified row as delivered by a series source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Ordered bars of one timeframe of one instrument, oldest first.
///
/// Timestamps are strictly increasing. The core only ever reads a series; the
/// data layer replaces it wholesale on refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn from_bars(bars: Vec<Bar>) -> Self {
        debug_assert!(
            bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "series timestamps must be strictly increasing"
        );
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The first `len` bars (clamped to the series length).
    pub fn prefix(&self, len: usize) -> &[Bar] {
        &self.bars[..len.min(self.bars.len())]
    }

    /// Bars with `timestamp <= as_of`; never anything newer.
    pub fn as_of(&self, as_of: DateTime<Utc>) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.timestamp <= as_of);
        &self.bars[..end]
    }
}

/// One series per timeframe for a single instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    pub primary: Series,
    pub long: Series,
    pub medium: Series,
    pub correlated: Series,
}

impl SeriesSet {
    pub fn get(&self, timeframe: Timeframe) -> &Series {
        match timeframe {
            Timeframe::Primary => &self.primary,
            Timeframe::Long => &self.long,
            Timeframe::Medium => &self.medium,
            Timeframe::Correlated => &self.correlated,
        }
    }

    pub fn get_mut(&mut self, timeframe: Timeframe) -> &mut Series {
        match timeframe {
            Timeframe::Primary => &mut self.primary,
            Timeframe::Long => &mut self.long,
            Timeframe::Medium => &mut self.medium,
            Timeframe::Correlated => &mut self.correlated,
        }
    }

    /// Swap in a freshly loaded series, returning the old one.
    pub fn replace(&mut self, timeframe: Timeframe, series: Series) -> Series {
        std::mem::replace(self.get_mut(timeframe), series)
    }
}

/// First and last bar of the latest contiguous non-Shake segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBoundary {
    pub start: Bar,
    pub end: Bar,
}

impl PhaseBoundary {
    /// Signed momentum swing across the segment.
    pub fn momentum_range(&self) -> f64 {
        self.end.momentum - self.start.momentum
    }

    /// Signed price move across the segment.
    pub fn price_range(&self) -> f64 {
        self.end.close - self.start.close
    }
}

/// The timeframes the engine reads. `Primary` drives signal detection; the
/// others only feed position scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Primary,
    Long,
    Medium,
    Correlated,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Primary,
        Timeframe::Long,
        Timeframe::Medium,
        Timeframe::Correlated,
    ];

    /// Context timeframes in scoring order.
    pub const CONTEXT: [Timeframe; 3] = [Timeframe::Long, Timeframe::Medium, Timeframe::Correlated];
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Primary => write!(f, "primary"),
            Timeframe::Long => write!(f, "long"),
            Timeframe::Medium => write!(f, "medium"),
            Timeframe::Correlated => write!(f, "correlated"),
        }
    }
}

/// Bar granularity of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    FiveMinute,
    ThirtyMinute,
    FourHour,
    Day,
}

impl Interval {
    pub fn minutes(self) -> i64 {
        match self {
            Interval::FiveMinute => 5,
            Interval::ThirtyMinute => 30,
            Interval::FourHour => 240,
            Interval::Day => 1440,
        }
    }

    pub fn duration(self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes())
    }

    pub fn is_intraday(self) -> bool {
        !matches!(self, Interval::Day)
    }

    pub fn label(self) -> &'static str {
        match self {
            Interval::FiveMinute => "5m",
            Interval::ThirtyMinute => "30m",
            Interval::FourHour => "4h",
            Interval::Day => "1d",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Market the instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Session-based stock market (Shanghai/Shenzhen).
    Equity,
    /// Continuous 24/7 derivatives market.
    PerpetualSwap,
}

impl SourceKind {
    /// Symbol of the correlated index for perpetual swaps.
    pub const SWAP_INDEX: &'static str = ".BXBT";

    pub fn interval(self, timeframe: Timeframe) -> Interval {
        match (self, timeframe) {
            (_, Timeframe::Primary) => Interval::FiveMinute,
            (_, Timeframe::Medium) | (_, Timeframe::Correlated) => Interval::ThirtyMinute,
            (SourceKind::Equity, Timeframe::Long) => Interval::Day,
            (SourceKind::PerpetualSwap, Timeframe::Long) => Interval::FourHour,
        }
    }

    /// The instrument whose series backs `timeframe` when trading `symbol`.
    pub fn symbol_for(self, timeframe: Timeframe, symbol: &str) -> crate::Result<String> {
        match timeframe {
            Timeframe::Primary | Timeframe::Long | Timeframe::Medium => Ok(symbol.to_string()),
            Timeframe::Correlated => self.correlated_symbol(symbol),
        }
    }

    fn correlated_symbol(self, symbol: &str) -> crate::Result<String> {
        match self {
            SourceKind::Equity => match symbol.chars().next() {
                Some('0') => Ok("sz".to_string()),
                Some('6') => Ok("sh".to_string()),
                _ => Err(Error::Config(format!(
                    "cannot derive the correlated index for equity symbol '{symbol}'"
                ))),
            },
            SourceKind::PerpetualSwap => Ok(Self::SWAP_INDEX.to_string()),
        }
    }

    /// Session-based markets close daily and support same/next-session timing.
    pub fn is_session_based(self) -> bool {
        matches!(self, SourceKind::Equity)
    }

    pub fn slug(self) -> &'static str {
        match self {
            SourceKind::Equity => "equity",
            SourceKind::PerpetualSwap => "perpetual-swap",
        }
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equity" | "ashare" => Ok(SourceKind::Equity),
            "perpetual-swap" | "perpetualswap" | "bitmex" => Ok(SourceKind::PerpetualSwap),
            other => Err(Error::Config(format!(
                "SOURCE_KIND must be 'equity' or 'perpetual-swap', got: '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Nature of a fired trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    DivergenceBuy,
    NormalSell,
    DivergenceSell,
    NormalBuy,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::DivergenceBuy => write!(f, "divergence-buy"),
            SignalKind::NormalSell => write!(f, "normal-sell"),
            SignalKind::DivergenceSell => write!(f, "divergence-sell"),
            SignalKind::NormalBuy => write!(f, "normal-buy"),
        }
    }
}

/// State of one timeframe captured when a signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSnapshot {
    pub status: TrendStatus,
    /// Absolute momentum swing of the timeframe's latest segment.
    pub phase_momentum_range: f64,
    /// Current momentum deviation as a rounded percentage of the swing.
    pub momentum_deviation_percent: i64,
    pub run_length: u32,
}

/// Immutable record of a fired signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: SignalKind,
    pub primary: TimeframeSnapshot,
    /// `None` when the context timeframe had too little history to read.
    pub long: Option<TimeframeSnapshot>,
    pub medium: Option<TimeframeSnapshot>,
    pub correlated: Option<TimeframeSnapshot>,
    /// Number of context timeframes opposing the signal, 0..=3.
    pub position_score: u8,
}

impl TradeEvent {
    pub fn snapshot(&self, timeframe: Timeframe) -> Option<&TimeframeSnapshot> {
        match timeframe {
            Timeframe::Primary => Some(&self.primary),
            Timeframe::Long => self.long.as_ref(),
            Timeframe::Medium => self.medium.as_ref(),
            Timeframe::Correlated => self.correlated.as_ref(),
        }
    }
}

/// Per-instrument memory carried from one evaluation to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineState {
    /// The primary timeframe is believed to be consolidating.
    pub in_shake: bool,
    /// The last evaluated primary segment showed price/momentum divergence.
    pub is_divergent: bool,
}

/// Whether another signal is expected before the current session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradingMode {
    SameSession,
    NextSession,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::SameSession => write!(f, "same-session"),
            TradingMode::NextSession => write!(f, "next-session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(minute: i64) -> Bar {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 1, 30, 0).unwrap()
            + chrono::Duration::minutes(minute);
        Bar::new(ts, 10.0, 0.0, BarStatus::Up, 1)
    }

    #[test]
    fn as_of_never_returns_future_bars() {
        let series = Series::from_bars((0..6).map(|i| bar_at(i * 30)).collect());
        let cutoff = bar_at(65).timestamp;
        let visible = series.as_of(cutoff);
        assert_eq!(visible.len(), 3);
        assert!(visible.iter().all(|b| b.timestamp <= cutoff));
    }

    #[test]
    fn as_of_includes_bar_at_exact_timestamp() {
        let series = Series::from_bars((0..4).map(|i| bar_at(i * 30)).collect());
        assert_eq!(series.as_of(bar_at(60).timestamp).len(), 3);
    }

    #[test]
    fn transitional_status_uses_prior_direction() {
        let status = TrendStatus::Transitional {
            prior: BarStatus::Down,
            current: BarStatus::Shake,
        };
        assert_eq!(status.effective_direction(), Some(Direction::Down));
        assert_eq!(status.to_string(), "down-shake");
    }

    #[test]
    fn equity_correlated_index_follows_exchange_prefix() {
        let kind = SourceKind::Equity;
        assert_eq!(kind.symbol_for(Timeframe::Correlated, "000001").unwrap(), "sz");
        assert_eq!(kind.symbol_for(Timeframe::Correlated, "600519").unwrap(), "sh");
        assert!(kind.symbol_for(Timeframe::Correlated, "300750").is_err());
        assert_eq!(kind.symbol_for(Timeframe::Long, "300750").unwrap(), "300750");
    }

    #[test]
    fn swap_uses_four_hour_long_timeframe() {
        assert_eq!(SourceKind::PerpetualSwap.interval(Timeframe::Long), Interval::FourHour);
        assert_eq!(SourceKind::Equity.interval(Timeframe::Long), Interval::Day);
        assert_eq!(
            SourceKind::PerpetualSwap
                .symbol_for(Timeframe::Correlated, "XBTUSD")
                .unwrap(),
            ".BXBT"
        );
    }

    #[test]
    fn unknown_source_kind_is_config_error() {
        assert!(matches!("forex".parse::<SourceKind>(), Err(Error::Config(_))));
        assert_eq!("BitMEX".parse::<SourceKind>().unwrap(), SourceKind::PerpetualSwap);
    }
}
