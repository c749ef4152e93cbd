use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use common::{Result, TradeEvent};

/// Append-only JSON-lines log of fired trade events.
#[derive(Debug, Clone)]
pub struct TradeJournal {
    path: PathBuf,
}

impl TradeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn append(&self, event: &TradeEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), kind = %event.kind, "Trade event journaled");
        Ok(())
    }
}
