//! Main configuration module for Meridian
//!
//! All sync engine settings live in one `meridian.toml` file with a section
//! per concern. Every section has defaults, so an empty file is valid.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Block synchronization parameters
    #[serde(default)]
    pub sync: SyncConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use meridian_config::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load(Path::new("meridian.toml"))?;
    /// ```
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!(path = ?path, "Loading configuration");

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_str(&content)?;

        info!(
            wait_time_ms = config.sync.wait_time_ms,
            num_shards = config.storage.num_shards,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// Useful for testing or when configuration is provided as a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        debug!("Configuration parsed successfully, validating...");
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.sync.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(path = ?path, "Configuration saved");
        Ok(())
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Block synchronization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on waiting for a requested header or body
    pub wait_time_ms: u64,

    /// Pause between two sync attempts
    pub sleep_time_ms: u64,

    /// Consecutive timeouts tolerated before a rollback is forced
    pub max_requests_with_timeout_allowed: u32,

    /// A round is proper when `index % round_modulus_trigger == 0`
    pub round_modulus_trigger: i64,

    /// How many headers past the current one are requested ahead
    pub max_headers_to_request_in_advance: u64,

    /// Blocks below the storage head that must load with it (shard chain)
    pub shard_block_finality: u64,

    /// Blocks below the storage head that must load with it (metachain)
    pub meta_block_finality: u64,
}

impl SyncConfig {
    /// Validate sync parameters.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.wait_time_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "sync.wait_time_ms",
                value: self.wait_time_ms,
            });
        }
        if self.sleep_time_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                name: "sync.sleep_time_ms",
                value: self.sleep_time_ms,
            });
        }
        if self.round_modulus_trigger <= 0 {
            return Err(ConfigError::ZeroValue("sync.round_modulus_trigger"));
        }
        Ok(())
    }

    /// Wait bound as a [`Duration`].
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }

    /// Loop pause as a [`Duration`].
    pub fn sleep_time(&self) -> Duration {
        Duration::from_millis(self.sleep_time_ms)
    }

    /// Returns true when `round_index` is a proper round.
    pub fn is_in_proper_round(&self, round_index: i64) -> bool {
        round_index % self.round_modulus_trigger == 0
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            wait_time_ms: 2000,
            sleep_time_ms: 5,
            max_requests_with_timeout_allowed: 5,
            round_modulus_trigger: 5,
            max_headers_to_request_in_advance: 10,
            shard_block_finality: 1,
            meta_block_finality: 1,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database directory
    pub path: String,

    /// Number of shards in the network
    pub num_shards: u32,

    /// Enable LZ4 compression
    pub enable_compression: bool,

    /// Maximum number of open files
    pub max_open_files: i32,
}

impl StorageConfig {
    /// Validate storage settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.path.is_empty() {
            return Err(ConfigError::MissingField("storage.path"));
        }
        if self.num_shards == 0 {
            return Err(ConfigError::ZeroValue("storage.num_shards"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data/meridian".to_string(),
            num_shards: 1,
            enable_compression: true,
            max_open_files: 512,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl LoggingConfig {
    /// Validate level and format names.
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["json", "pretty", "compact"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
