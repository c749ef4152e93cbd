use crate::{Error, Result, SourceKind};

/// All configuration loaded from environment variables at startup.
/// Missing or malformed required variables are reported as `Error::Config`
/// and the engine refuses to start.
#[derive(Debug, Clone)]
pub struct Config {
    // Instrument
    pub symbol: String,
    pub source_kind: SourceKind,

    // Run mode
    /// Replay stored history only; never call the live update path.
    pub backtest: bool,
    /// Gate refreshes on the session calendar instead of pulling every tick.
    pub rewrite_on_update: bool,

    // Signal detection
    /// Fraction of the prior segment's momentum swing tolerated as noise.
    pub tolerance_factor: f64,

    // Data
    pub data_dir: String,
    pub poll_interval_secs: u64,
    /// Optional JSON-lines file every fired trade event is appended to.
    pub trade_log_path: Option<String>,

    // Tunables file path
    pub engine_settings_path: Option<String>,
}

impl Config {
    pub const DEFAULT_TOLERANCE_FACTOR: f64 = 0.1;

    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbol = required(&lookup, "SYMBOL")?;
        let source_kind: SourceKind = required(&lookup, "SOURCE_KIND")?.parse()?;

        let tolerance_factor = match lookup("TOLERANCE_FACTOR") {
            Some(raw) => parse_value::<f64>("TOLERANCE_FACTOR", &raw)?,
            None => Self::DEFAULT_TOLERANCE_FACTOR,
        };
        if !tolerance_factor.is_finite() || tolerance_factor < 0.0 {
            return Err(Error::Config(format!(
                "TOLERANCE_FACTOR must be a non-negative number, got: {tolerance_factor}"
            )));
        }

        let poll_interval_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(raw) => parse_value::<u64>("POLL_INTERVAL_SECS", &raw)?,
            None => 60,
        };
        if poll_interval_secs == 0 {
            return Err(Error::Config("POLL_INTERVAL_SECS must be at least 1".into()));
        }

        Ok(Config {
            symbol,
            source_kind,
            backtest: flag(&lookup, "BACKTEST")?,
            rewrite_on_update: flag(&lookup, "REWRITE_ON_UPDATE")?,
            tolerance_factor,
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()),
            poll_interval_secs,
            trade_log_path: lookup("TRADE_LOG_PATH").filter(|p| !p.trim().is_empty()),
            engine_settings_path: lookup("ENGINE_SETTINGS_PATH").filter(|p| !p.trim().is_empty()),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::Config(format!(
                "Required environment variable '{key}' is not set. Check your .env file."
            ))
        })
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(Error::Config(format!(
                "{key} must be a boolean, got: '{other}'"
            ))),
        },
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'")))
}
