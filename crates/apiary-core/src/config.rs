//! Configuration for apiary-core
//!
//! Where the per-namespace databases live and the capacity limits the
//! registries enforce.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default number of open tabs per application
pub const DEFAULT_MAX_TABS: usize = 15;

/// Default number of retained history entries per application
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one database file per namespace.
    /// `None` resolves to the platform's local data directory.
    pub data_dir: Option<PathBuf>,
    /// Keep every store in memory; nothing survives the process
    pub in_memory: bool,
    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
    /// Capacity limits
    pub limits: LimitsConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            busy_timeout_ms: 5_000,
            limits: LimitsConfig::default(),
        }
    }
}

/// Capacity limits per namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Inserts beyond this are rejected
    pub max_tabs: usize,
    /// Inserts beyond this evict the oldest entries
    pub max_history: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tabs: DEFAULT_MAX_TABS,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory configuration, mostly for tests
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    /// Configuration rooted at an explicit directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// The directory databases are created in
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|d| d.join("apiary"))
                .ok_or_else(|| {
                    ConfigError::MissingField(
                        "data_dir (no platform data directory available)".to_string(),
                    )
                }),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_tabs == 0 {
            return Err(ConfigError::OutOfRange(
                "limits.max_tabs must be positive".to_string(),
            ));
        }

        if self.limits.max_history == 0 {
            return Err(ConfigError::OutOfRange(
                "limits.max_history must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
    /// Configuration text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(String),
}
