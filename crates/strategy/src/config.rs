use serde::{Deserialize, Serialize};

use common::{Error, Result};

use crate::indicators::{MacdIndicator, TrendClassifier};
use crate::shake::{ShakeDetector, DEFAULT_MIN_RUN_LENGTH};

/// Engine tunables file (TOML). Every key is optional; unknown keys are
/// rejected.
///
/// Example `config/engine.toml`:
/// ```toml
/// min_run_length = 5
///
/// [classifier]
/// fast = 12
/// slow = 26
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Minimum primary segment length (bars) before a shake entry may fire.
    pub min_run_length: u32,
    pub classifier: ClassifierSettings,
}

/// MACD periods used to compute bar momentum.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierSettings {
    pub fast: usize,
    pub slow: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_run_length: DEFAULT_MIN_RUN_LENGTH,
            classifier: ClassifierSettings::default(),
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
        }
    }
}

impl EngineSettings {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read engine settings at '{path}': {e}"))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Invalid engine settings at '{path}': {e}")))
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        if c.fast == 0 || c.fast >= c.slow {
            return Err(Error::Config(format!(
                "classifier.fast ({}) must be positive and less than classifier.slow ({})",
                c.fast, c.slow
            )));
        }
        if self.min_run_length == 0 {
            return Err(Error::Config("min_run_length must be at least 1".into()));
        }
        Ok(())
    }

    pub fn detector(&self, tolerance_factor: f64) -> ShakeDetector {
        ShakeDetector::new(tolerance_factor, self.min_run_length)
    }

    pub fn classifier(&self, factor: f64) -> TrendClassifier {
        let c = &self.classifier;
        TrendClassifier::new(MacdIndicator::new(c.fast, c.slow), factor)
    }
}
