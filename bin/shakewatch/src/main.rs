use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{ExchangeCalendar, FileSource, Monitor, TracingSink};
use strategy::EngineSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Failed to load configuration")?;
    let settings = EngineSettings::load_or_default(cfg.engine_settings_path.as_deref())
        .context("Failed to load engine settings")?;
    info!(
        symbol = %cfg.symbol,
        source_kind = %cfg.source_kind,
        backtest = cfg.backtest,
        "ShakeWatch starting"
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let source = Arc::new(FileSource::new(&cfg.data_dir, settings.clone()));
    let calendar = Arc::new(ExchangeCalendar::new(cfg.source_kind));

    // ── Monitor ───────────────────────────────────────────────────────────────
    let mut monitor = Monitor::new(cfg, &settings, source, calendar, TracingSink)
        .context("Failed to initialize monitor")?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Without a signal handler, run until the process is killed.
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    monitor.run(shutdown).await.context("Monitor stopped with an error")?;

    info!(signals = monitor.events().len(), "Exiting");
    Ok(())
}
