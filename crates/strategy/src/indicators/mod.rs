pub mod classify;
pub mod macd;

pub use classify::{label_runs, TrendClassifier};
pub use macd::MacdIndicator;
