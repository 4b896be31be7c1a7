use facetrack_core::{LocatorConfig, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Tracker configuration: TOML file, then `FACETRACK_*` environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Time between detection ticks.
    pub tick_interval_ms: u64,
    /// Maximum age of a detection before it is reported as unknown.
    pub staleness_ms: u64,
    pub locator: LocatorConfig,
    pub scoring: ScoringConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            staleness_ms: 500,
            locator: LocatorConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load from `path`, or `FACETRACK_CONFIG` if unset, or defaults if
    /// neither names a file. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FACETRACK_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `FACETRACK_*` overrides from `lookup`. Unparseable or
    /// out-of-range values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let parse_u32 = |key: &str| parse(key).and_then(|v| u32::try_from(v).ok());

        if let Some(v) = parse("FACETRACK_TICK_INTERVAL_MS") {
            self.tick_interval_ms = v;
        }
        if let Some(v) = parse("FACETRACK_STALENESS_MS") {
            self.staleness_ms = v;
        }
        if let Some(v) = parse_u32("FACETRACK_SAMPLE_STEP") {
            self.locator.sample_step = v;
        }
        if let Some(v) = parse_u32("FACETRACK_MIN_MATCHES") {
            self.locator.min_matches = v;
        }
        if let Some(v) = parse_u32("FACETRACK_SATURATION_MATCHES") {
            self.locator.saturation_matches = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.locator.sample_step == 0 {
            return Err(ConfigError::Invalid("locator.sample_step must be positive".into()));
        }
        if self.locator.window_divisor == 0 {
            return Err(ConfigError::Invalid("locator.window_divisor must be positive".into()));
        }
        if self.locator.saturation_matches < self.locator.min_matches {
            return Err(ConfigError::Invalid(format!(
                "locator.saturation_matches ({}) is below locator.min_matches ({})",
                self.locator.saturation_matches, self.locator.min_matches
            )));
        }
        if self.scoring.centered_fraction > self.scoring.near_center_fraction {
            return Err(ConfigError::Invalid(
                "scoring.centered_fraction exceeds scoring.near_center_fraction".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }
}
