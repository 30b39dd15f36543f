//! Configuration file loading for game review.
//!
//! Settings live in `review.toml` by default. Every field has a default,
//! so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::{DEFAULT_BASE_URL, DEFAULT_PACING};
use crate::quality::Thresholds;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// The file parsed but holds values that cannot work together.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which evaluation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Cloud evaluation service over HTTP.
    #[default]
    Remote,
    /// Local UCI engine process.
    Local,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(BackendKind::Remote),
            "local" => Ok(BackendKind::Local),
            other => Err(format!("unknown backend '{}', expected 'remote' or 'local'", other)),
        }
    }
}

/// Cloud evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Minimum gap between the end of one response and the next request.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING.as_millis() as u64
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            pacing_ms: default_pacing_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Local engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalConfig {
    /// Path to the UCI engine. Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub engine_path: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Searches that may wait behind the one in flight.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Give up waiting for a search after this long. No limit when unset.
    #[serde(default)]
    pub search_timeout_secs: Option<u64>,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_depth() -> u32 {
    15
}

fn default_queue_capacity() -> usize {
    8
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            depth: default_depth(),
            queue_capacity: default_queue_capacity(),
            search_timeout_secs: None,
        }
    }
}

/// Main review configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Most key moments kept in a report.
    #[serde(default = "default_key_moments")]
    pub key_moments: usize,
    /// Plies kept from each engine line.
    #[serde(default = "default_pv_plies")]
    pub pv_plies: usize,
    /// Tier known opening moves as book.
    #[serde(default)]
    pub book: bool,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_key_moments() -> usize {
    5
}

fn default_pv_plies() -> usize {
    uci::DEFAULT_PV_PLIES
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            key_moments: default_key_moments(),
            pv_plies: default_pv_plies(),
            book: false,
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl ReviewConfig {
    /// Loads the configuration from `review.toml` in the working directory.
    ///
    /// Returns the defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads the configuration from `path`, or the defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] for invalid TOML, and
    /// [`ConfigError::Invalid`] for settings that fail [`Self::validate`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default configuration file path.
    pub fn config_path() -> PathBuf {
        PathBuf::from("review.toml")
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if !(t.great >= t.good && t.good >= t.inaccuracy && t.inaccuracy >= t.mistake) {
            return Err(ConfigError::Invalid(
                "thresholds must descend: great >= good >= inaccuracy >= mistake".to_string(),
            ));
        }
        if self.local.queue_capacity == 0 {
            return Err(ConfigError::Invalid("local.queue_capacity must be at least 1".to_string()));
        }
        if self.local.depth == 0 {
            return Err(ConfigError::Invalid("local.depth must be at least 1".to_string()));
        }
        if self.pv_plies == 0 {
            return Err(ConfigError::Invalid("pv_plies must be at least 1".to_string()));
        }
        Ok(())
    }
}
