pub mod calendar;
pub mod feed;
pub mod journal;
pub mod lifecycle;
pub mod sink;

pub use calendar::ExchangeCalendar;
pub use feed::FileSource;
pub use journal::TradeJournal;
pub use lifecycle::Monitor;
pub use sink::{MemorySink, TracingSink};
