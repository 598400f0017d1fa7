//! Configuration types for Cassette

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CassetteError, Result};

/// File extension used for cassette archives
pub const CASSETTE_EXTENSION: &str = "json";

/// Record mode controlling when new interactions may be added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Record only while the cassette file did not exist at load time
    #[default]
    Once,
    /// Replay known requests, record unknown ones
    NewEpisodes,
    /// Replay only, never record
    None,
    /// Always perform the real request and record it
    All,
}

impl RecordMode {
    /// Name used in configuration files and messages
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::NewEpisodes => "new_episodes",
            Self::None => "none",
            Self::All => "all",
        }
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordMode {
    type Err = CassetteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "once" => Ok(Self::Once),
            "new_episodes" => Ok(Self::NewEpisodes),
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            other => Err(CassetteError::ConfigError(format!(
                "Unknown record mode '{other}'"
            ))),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding cassette files
    pub cassette_dir: PathBuf,
    /// Record mode applied to every cassette opened with this config
    #[serde(default)]
    pub record_mode: RecordMode,
    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// HTTP transport tuning
    #[serde(default)]
    pub http: HttpConfig,
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum response body size materialized into an interaction
    pub max_response_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

/// HTTP client pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Idle connection timeout in seconds
    pub pool_idle_timeout_secs: u64,
    /// Maximum idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 10,
        }
    }
}

impl Config {
    /// Create a configuration with default limits for a cassette directory
    #[must_use]
    pub fn new(cassette_dir: impl Into<PathBuf>, record_mode: RecordMode) -> Self {
        Self {
            cassette_dir: cassette_dir.into(),
            record_mode,
            limits: LimitsConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed, or is invalid
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CassetteError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CassetteError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.cassette_dir.as_os_str().is_empty() {
            return Err(CassetteError::ConfigError(
                "cassette_dir cannot be empty".to_string(),
            ));
        }

        if self.limits.max_response_size == 0 {
            return Err(CassetteError::ConfigError(
                "max_response_size must be > 0".to_string(),
            ));
        }

        if self.http.pool_max_idle_per_host == 0 {
            return Err(CassetteError::ConfigError(
                "pool_max_idle_per_host must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the archive path for a named cassette
    ///
    /// # Errors
    ///
    /// Returns error if the name is not a safe file stem
    pub fn cassette_path(&self, name: &str) -> Result<PathBuf> {
        validate_cassette_name(name)?;
        Ok(self
            .cassette_dir
            .join(format!("{name}.{CASSETTE_EXTENSION}")))
    }
}

/// Validate a cassette name
///
/// # Errors
///
/// Returns error if cassette name is invalid
pub fn validate_cassette_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CassetteError::InvalidCassetteName(
            "Cassette name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(CassetteError::InvalidCassetteName(format!(
            "Cassette name too long: {} > 255",
            name.len()
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(CassetteError::InvalidCassetteName(
            "Cassette name cannot contain path separators".to_string(),
        ));
    }

    if name.starts_with('.') {
        return Err(CassetteError::InvalidCassetteName(
            "Cassette name cannot start with dot".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(CassetteError::InvalidCassetteName(
            "Cassette name cannot contain null bytes".to_string(),
        ));
    }

    if name.contains("..") {
        return Err(CassetteError::InvalidCassetteName(
            "Cassette name cannot contain '..'".to_string(),
        ));
    }

    Ok(())
}
