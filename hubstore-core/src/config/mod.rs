//! Configuration management for the hub store
//!
//! Defaults, TOML files and `HUBSTORE_*` environment overrides, validated
//! before use.

use crate::core_store::kv::{KvStore, MemoryKv, SqliteKv};
use crate::core_store::model::Network;
use crate::core_store::store::{PruneLimits, StoreResult, DEFAULT_CHANNEL_CAPACITY, PAGE_SIZE_MAX};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Name of the SQLite file inside `data_dir`
pub const SQLITE_FILE_NAME: &str = "hub.db";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Substrate and store-wide settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-kind retention limits
    #[serde(default)]
    pub pruning: PruningConfig,

    /// Event queue settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::InvalidValue(format!("Unknown storage backend: {}", other))),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StorageBackend,

    /// Directory holding the SQLite file
    pub data_dir: PathBuf,

    /// Upper bound on every page
    pub page_size_max: usize,

    /// Reject non-signer messages whose signer has no live SignerAdd
    pub require_active_signer: bool,

    /// Network messages must be signed for
    pub network: Network,
}

/// Retention limits per message kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruningConfig {
    pub casts: PruneLimits,
    pub reactions: PruneLimits,
    pub signers: PruneLimits,
    pub verifications: PruneLimits,
    pub user_data: PruneLimits,
}

/// Event queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Bounded broadcast queue size
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            page_size_max: PAGE_SIZE_MAX,
            require_active_signer: true,
            network: Network::Devnet,
        }
    }
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            casts: PruneLimits::new(10_000).with_time_limit(Duration::from_secs(365 * 24 * 60 * 60)),
            reactions: PruneLimits::new(5_000),
            signers: PruneLimits::new(1_000),
            verifications: PruneLimits::new(50),
            user_data: PruneLimits::new(100),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { channel_capacity: DEFAULT_CHANNEL_CAPACITY }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false, with_target: true }
    }
}

impl StoreConfig {
    /// Open the configured substrate
    pub fn open_kv(&self) -> StoreResult<Arc<dyn KvStore>> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryKv::new())),
            StorageBackend::Sqlite => {
                std::fs::create_dir_all(&self.data_dir)?;
                Ok(Arc::new(SqliteKv::open(self.data_dir.join(SQLITE_FILE_NAME))?))
            }
        }
    }
}

fn parse_env<T: FromStr>(name: &str, what: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: HUBSTORE_<SECTION>_<KEY>
    /// Example: HUBSTORE_STORE_BACKEND=sqlite
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HUBSTORE_*` overrides on top of the current values
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(backend) = parse_env("HUBSTORE_STORE_BACKEND", "storage backend")? {
            self.store.backend = backend;
        }
        if let Ok(data_dir) = env::var("HUBSTORE_STORE_DATA_DIR") {
            self.store.data_dir = PathBuf::from(data_dir);
        }
        if let Some(size) = parse_env("HUBSTORE_STORE_PAGE_SIZE_MAX", "page size")? {
            self.store.page_size_max = size;
        }
        if let Some(network) = parse_env::<Network>("HUBSTORE_STORE_NETWORK", "network")? {
            self.store.network = network;
        }
        if let Some(capacity) = parse_env("HUBSTORE_EVENTS_CHANNEL_CAPACITY", "channel capacity")? {
            self.events.channel_capacity = capacity;
        }
        if let Ok(level) = env::var("HUBSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("HUBSTORE_LOG_JSON", "JSON flag")? {
            self.logging.json_format = json;
        }
        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.page_size_max == 0 || self.store.page_size_max > PAGE_SIZE_MAX {
            return Err(ConfigError::ValidationFailed(format!(
                "page_size_max must be between 1 and {}",
                PAGE_SIZE_MAX
            )));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        let limits = [
            ("casts", &self.pruning.casts),
            ("reactions", &self.pruning.reactions),
            ("signers", &self.pruning.signers),
            ("verifications", &self.pruning.verifications),
            ("user_data", &self.pruning.user_data),
        ];
        for (name, limit) in limits {
            if limit.size_limit == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "pruning.{}.size_limit must be greater than 0",
                    name
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| ConfigError::io(path, e))
    }
}
