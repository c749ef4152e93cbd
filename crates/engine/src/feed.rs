use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use common::{Error, Interval, RawBar, Result, Series, SeriesSource, SourceKind};
use strategy::EngineSettings;

/// `SeriesSource` over JSON-lines files, one `{"timestamp", "close"}` object
/// per line, laid out as `<root>/<source-kind>/<symbol>/<interval>.jsonl`.
///
/// A missing file is an empty series; the context timeframes it backs are
/// then reported as unavailable.
pub struct FileSource {
    root: PathBuf,
    settings: EngineSettings,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>, settings: EngineSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    pub fn path_for(&self, interval: Interval, source_kind: SourceKind, symbol: &str) -> PathBuf {
        self.root
            .join(source_kind.slug())
            .join(symbol)
            .join(format!("{}.jsonl", interval.label()))
    }

    async fn read_rows(&self, path: &Path) -> Result<Vec<RawBar>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "No stored series; treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        parse_rows(&content).map_err(|e| Error::Source(format!("{}: {e}", path.display())))
    }
}

/// Parse JSON-lines rows, skipping blank lines.
pub fn parse_rows(content: &str) -> Result<Vec<RawBar>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<RawBar>(line)
                .map_err(|e| Error::Source(format!("line {}: {e}", n + 1)))
        })
        .collect()
}

#[async_trait]
impl SeriesSource for FileSource {
    async fn load_initial(
        &self,
        interval: Interval,
        source_kind: SourceKind,
        symbol: &str,
        factor: f64,
    ) -> Result<Series> {
        let path = self.path_for(interval, source_kind, symbol);
        let rows = self.read_rows(&path).await?;
        let series = self.settings.classifier(factor).classify(rows);
        debug!(symbol, %interval, bars = series.len(), "Series loaded");
        Ok(series)
    }

    async fn fetch_new(
        &self,
        interval: Interval,
        source_kind: SourceKind,
        since: DateTime<Utc>,
        symbol: &str,
        rewrite: bool,
    ) -> Result<Vec<RawBar>> {
        // The files are the store; there is no upstream to write back from.
        let path = self.path_for(interval, source_kind, symbol);
        let rows: Vec<RawBar> = self
            .read_rows(&path)
            .await?
            .into_iter()
            .filter(|r| r.timestamp >= since)
            .collect();
        debug!(symbol, %interval, %since, rewrite, rows = rows.len(), "Fetched new rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 1, minute, 0).unwrap()
    }

    async fn write_series(root: &Path, rows: &[(u32, f64)]) -> FileSource {
        let source = FileSource::new(root, EngineSettings::default());
        let path = source.path_for(Interval::FiveMinute, SourceKind::Equity, "600519");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        let body: String = rows
            .iter()
            .map(|&(minute, close)| {
                serde_json::to_string(&RawBar {
                    timestamp: at(minute),
                    close,
                })
                .unwrap()
                    + "\n"
            })
            .collect();
        tokio::fs::write(&path, body).await.unwrap();
        source
    }

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let rows = parse_rows(
            "{\"timestamp\":\"2024-03-04T01:30:00Z\",\"close\":10.5}\n\n\
             {\"timestamp\":\"2024-03-04T01:35:00Z\",\"close\":10.7}\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].close, 10.7);
    }

    #[test]
    fn malformed_row_names_its_line() {
        let err = parse_rows("{\"timestamp\":\"2024-03-04T01:30:00Z\",\"close\":1}\nnot json\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn loads_and_classifies_stored_history() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_series(dir.path(), &[(30, 10.0), (35, 10.2), (40, 10.1)]).await;
        let series = source
            .load_initial(Interval::FiveMinute, SourceKind::Equity, "600519", 0.1)
            .await
            .unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.bars()[0].status.is_shake());
    }

    #[tokio::test]
    async fn fetch_new_keeps_rows_from_since() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_series(dir.path(), &[(30, 10.0), (35, 10.2), (40, 10.1)]).await;
        let rows = source
            .fetch_new(Interval::FiveMinute, SourceKind::Equity, at(35), "600519", false)
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![at(35), at(40)]);
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path(), EngineSettings::default());
        let series = source
            .load_initial(Interval::ThirtyMinute, SourceKind::Equity, "sh", 0.1)
            .await
            .unwrap();
        assert!(series.is_empty());
    }
}
