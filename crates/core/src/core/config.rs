//! Client configuration: file + environment layering for the CLI, and the
//! parameter surface (presets, recognized ranges) shared with the web UI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{ControllerOptions, TickOverlap, DEFAULT_POLL_INTERVAL};
use crate::types::GaConfig;

pub const APP_DIR: &str = "verso";
pub const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "VERSO_API_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "VERSO_POLL_INTERVAL_MS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Phrases offered as one-click targets.
pub const TARGET_PRESETS: &[&str] = &[
    "TO BE OR NOT TO BE",
    "METHINKS IT IS LIKE A WEASEL",
    "ALL THE WORLDS A STAGE",
    "HELLO WORLD",
    "TO BE",
];

/// Range a UI widget should offer for one GA parameter. The service owns the
/// real validation; these only shape the input controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// What the service uses when the field is left out.
    pub service_default: f64,
}

impl ParamRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

pub const POPULATION_SIZE: ParamRange = ParamRange {
    key: "population_size",
    label: "Population size",
    min: 10.0,
    max: 1000.0,
    step: 10.0,
    service_default: 200.0,
};

pub const MUTATION_RATE: ParamRange = ParamRange {
    key: "mutation_rate",
    label: "Mutation rate",
    min: 0.001,
    max: 0.1,
    step: 0.001,
    service_default: 0.01,
};

pub const CROSSOVER_RATE: ParamRange = ParamRange {
    key: "crossover_rate",
    label: "Crossover rate",
    min: 0.0,
    max: 1.0,
    step: 0.05,
    service_default: 0.8,
};

pub const ELITISM_COUNT: ParamRange = ParamRange {
    key: "elitism_count",
    label: "Elitism count",
    min: 0.0,
    max: 10.0,
    step: 1.0,
    service_default: 2.0,
};

pub const PARAM_RANGES: [ParamRange; 4] =
    [POPULATION_SIZE, MUTATION_RATE, CROSSOVER_RATE, ELITISM_COUNT];

/// Look up a preset by 1-based index or by case-insensitive phrase.
pub fn find_preset(key: &str) -> Option<&'static str> {
    let key = key.trim();
    if let Ok(n) = key.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| TARGET_PRESETS.get(i)).copied();
    }
    TARGET_PRESETS
        .iter()
        .copied()
        .find(|p| p.eq_ignore_ascii_case(key))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{key}={value:?} is not a whole number of milliseconds")]
    Env { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub tick_overlap: TickOverlap,
    /// Parameter defaults applied when a command does not set them.
    pub ga: GaConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tick_overlap: TickOverlap::default(),
            ga: GaConfig::default(),
        }
    }
}

impl CliConfig {
    /// `<config dir>/verso/config.json`.
    #[cfg(feature = "native")]
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Env {
                        key: ENV_POLL_INTERVAL_MS,
                        value,
                    })?;
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions::default()
            .with_poll_interval(self.poll_interval())
            .with_overlap(self.tick_overlap)
    }
}
