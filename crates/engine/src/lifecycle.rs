use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, DurationRound, Utc};
use tracing::{debug, error, info, warn};

use common::{
    Config, Interval, RawBar, ReportSink, Result, SeriesSet, SeriesSource, SessionCalendar,
    Timeframe, TradeEvent,
};
use strategy::indicators::TrendClassifier;
use strategy::{report, timing, EngineSettings, ReportHeader, SignalEngine};

use crate::journal::TradeJournal;

/// Where one timeframe's series comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub timeframe: Timeframe,
    pub interval: Interval,
    pub symbol: String,
}

/// Drives one instrument: loads its four series, keeps them fresh and reports
/// every signal the core fires.
pub struct Monitor<K: ReportSink> {
    config: Config,
    feeds: Vec<Feed>,
    header: ReportHeader,
    engine: SignalEngine,
    classifier: TrendClassifier,
    source: Arc<dyn SeriesSource>,
    calendar: Arc<dyn SessionCalendar>,
    sink: K,
    journal: Option<TradeJournal>,
}

impl<K: ReportSink> Monitor<K> {
    /// Fails when the correlated instrument cannot be derived from the symbol.
    pub fn new(
        config: Config,
        settings: &EngineSettings,
        source: Arc<dyn SeriesSource>,
        calendar: Arc<dyn SessionCalendar>,
        sink: K,
    ) -> Result<Self> {
        let kind = config.source_kind;
        let feeds = Timeframe::ALL
            .into_iter()
            .map(|timeframe| {
                Ok(Feed {
                    timeframe,
                    interval: kind.interval(timeframe),
                    symbol: kind.symbol_for(timeframe, &config.symbol)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let header = ReportHeader {
            symbol: config.symbol.clone(),
            source_kind: kind,
            correlated_symbol: kind.symbol_for(Timeframe::Correlated, &config.symbol)?,
        };
        let engine = SignalEngine::new(settings.detector(config.tolerance_factor), SeriesSet::default());
        let classifier = settings.classifier(config.tolerance_factor);
        let journal = config.trade_log_path.as_deref().map(TradeJournal::new);

        info!(
            symbol = %config.symbol,
            source_kind = %kind,
            correlated = %header.correlated_symbol,
            factor = config.tolerance_factor,
            backtest = config.backtest,
            "Monitor initialized"
        );

        Ok(Self {
            config,
            feeds,
            header,
            engine,
            classifier,
            source,
            calendar,
            sink,
            journal,
        })
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn series(&self) -> &SeriesSet {
        self.engine.series()
    }

    pub fn events(&self) -> &[TradeEvent] {
        self.engine.events()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Load every series. Outside backtest the series are refreshed and the
    /// signal state is warmed over the stored history, so the first live
    /// check only reports bars newer than what was loaded.
    pub async fn prepare(&mut self) -> Result<()> {
        for feed in &self.feeds {
            let series = self
                .source
                .load_initial(
                    feed.interval,
                    self.config.source_kind,
                    &feed.symbol,
                    self.config.tolerance_factor,
                )
                .await?;
            info!(
                timeframe = %feed.timeframe,
                symbol = %feed.symbol,
                bars = series.len(),
                "Series prepared"
            );
            self.engine.replace_series(feed.timeframe, series);
        }

        if !self.config.backtest {
            self.update().await?;
            let history = self.engine.replay();
            debug!(signals = history.len(), "Signal state warmed over stored history");
        }
        Ok(())
    }

    pub async fn update(&mut self) -> Result<()> {
        self.update_at(Utc::now()).await
    }

    /// Pull rows newer than each series' latest bar and reclassify.
    pub async fn update_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        let rewrite = self.config.rewrite_on_update;
        for feed in &self.feeds {
            let current = self.engine.series().get(feed.timeframe);
            let latest = current.latest().map(|b| b.timestamp);
            if let Some(last) = latest {
                if rewrite && !self.calendar.should_pull(last, feed.interval, now) {
                    continue;
                }
            }
            let since = latest.unwrap_or(DateTime::<Utc>::MIN_UTC);

            let mut rows = self
                .source
                .fetch_new(
                    feed.interval,
                    self.config.source_kind,
                    since,
                    &feed.symbol,
                    rewrite,
                )
                .await?;
            if rows.is_empty() {
                continue;
            }
            if !rewrite && feed.interval.is_intraday() {
                align_to_interval(&mut rows, feed.interval);
            }

            let merged = self.classifier.merge_and_classify(current, rows, since);
            debug!(timeframe = %feed.timeframe, bars = merged.len(), "Series updated");
            self.engine.replace_series(feed.timeframe, merged);
        }
        Ok(())
    }

    /// Backtest: replay the whole primary history and report every signal.
    pub async fn check_all(&mut self) -> Result<Vec<TradeEvent>> {
        let events = self.engine.replay();
        info!(
            bars = self.engine.series().primary.len(),
            signals = events.len(),
            "Backtest replay complete"
        );
        for event in &events {
            self.report(event).await?;
        }
        Ok(events)
    }

    /// Live: evaluate the bars that arrived since the previous check.
    pub async fn check_new(&mut self) -> Result<Vec<TradeEvent>> {
        let events = self.engine.tick().to_vec();
        for event in &events {
            self.report(event).await?;
        }
        Ok(events)
    }

    /// Prepare, then either run the backtest or poll until `shutdown`
    /// resolves. A failed poll is logged and retried on the next tick.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.prepare().await?;
        if self.config.backtest {
            self.check_all().await?;
            return Ok(());
        }

        let period = std::time::Duration::from_secs(self.config.poll_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(poll_secs = self.config.poll_interval_secs, "Live monitoring started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested; monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.update().await {
                        warn!(error = %e, "Series update failed; retrying next tick");
                        continue;
                    }
                    if let Err(e) = self.check_new().await {
                        error!(error = %e, "Signal check failed");
                    }
                }
            }
        }
        Ok(())
    }

    async fn report(&mut self, event: &TradeEvent) -> Result<()> {
        let bar_minutes = self.config.source_kind.interval(Timeframe::Primary).minutes();
        let estimate = timing::estimate(
            event.primary.run_length,
            bar_minutes,
            self.calendar.remaining_session_seconds(event.timestamp),
        );
        let lines = report::render(&self.header, event, &estimate);
        self.sink.emit(&lines);
        if let Some(journal) = &self.journal {
            journal.append(event).await?;
        }
        Ok(())
    }
}

/// Snap intraday row timestamps down to their bar's opening boundary.
fn align_to_interval(rows: &mut [RawBar], interval: Interval) {
    for row in rows {
        row.timestamp = row
            .timestamp
            .duration_trunc(interval.duration())
            .unwrap_or(row.timestamp);
    }
}
