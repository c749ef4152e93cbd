use tracing::info;

use common::ReportSink;

/// Writes every report line as an `info!` event under the `signal` target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&mut self, lines: &[String]) {
        for line in lines {
            info!(target: "signal", "{line}");
        }
    }
}

/// Keeps report lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl ReportSink for MemorySink {
    fn emit(&mut self, lines: &[String]) {
        self.lines.extend_from_slice(lines);
    }
}
