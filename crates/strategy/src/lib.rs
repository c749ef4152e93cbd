//! Multi-timeframe MACD shake signal engine.
//!
//! The primary timeframe drives detection: [`shake::ShakeDetector`] tells a
//! genuine reversal from a consolidation, [`divergence`] checks price against
//! momentum over the segment, and [`fusion`] folds the context timeframes into
//! a 0–3 position score. [`engine::SignalEngine`] threads the state through
//! every primary bar in order, live or in replay.

pub mod config;
pub mod divergence;
pub mod engine;
pub mod fusion;
pub mod indicators;
pub mod phase;
pub mod recorder;
pub mod report;
pub mod shake;
pub mod timing;

#[cfg(test)]
mod test_support;

pub use config::{ClassifierSettings, EngineSettings};
pub use engine::{evaluate, Evaluation, SignalEngine};
pub use fusion::{ContextReading, ContextReadings};
pub use recorder::TradeSignalRecorder;
pub use report::ReportHeader;
pub use shake::{ShakeDetector, Transition};
pub use timing::{SessionOutlook, TimingEstimate};
