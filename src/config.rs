// Global configuration constants - single source of truth

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub struct Config;

impl Config {
    // Storage layout
    pub const STORE_FILE: &'static str = "frontier.redb";
    pub const DEFAULT_DATA_DIR: &'static str = "./data";

    // Well-known regions
    pub const PENDING_REGION: &'static str = "PendingURLsDB";
    pub const IN_PROCESS_REGION: &'static str = "InProcessPagesDB";

    // Batching
    pub const DEFAULT_BATCH_SIZE: usize = 50;

    // Volatile mode: every Nth commit is durable so redb can reclaim freed pages
    pub const DEFERRED_FLUSH_INTERVAL: u64 = 1000;
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Whether frontier writes must survive a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityMode {
    /// Every write commits durably before returning.
    Resumable,
    /// Writes are deferred; a periodic durable commit and a graceful close
    /// persist them.
    Volatile,
}

impl DurabilityMode {
    pub fn from_resumable(resumable: bool) -> Self {
        if resumable {
            Self::Resumable
        } else {
            Self::Volatile
        }
    }
}

impl fmt::Display for DurabilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resumable => write!(f, "resumable"),
            Self::Volatile => write!(f, "volatile"),
        }
    }
}

/// Settings fixed once per crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Directory holding the frontier database.
    pub storage_folder: PathBuf,

    pub resumable: bool,

    /// Table name of the pending-URL queue.
    pub region: String,

    /// Links deeper than this are never scheduled. `None` means unlimited.
    pub max_depth: Option<u32>,

    /// Default number of records a controller pulls per `peek_batch`.
    pub batch_size: usize,

    /// Volatile mode only: make every Nth write commit durable. Bounds both
    /// file growth and what a crash can lose.
    pub flush_interval: u64,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            storage_folder: PathBuf::from(Config::DEFAULT_DATA_DIR),
            resumable: false,
            region: Config::PENDING_REGION.to_string(),
            max_depth: None,
            batch_size: Config::DEFAULT_BATCH_SIZE,
            flush_interval: Config::DEFERRED_FLUSH_INTERVAL,
        }
    }
}

impl FrontierConfig {
    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_folder.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_folder is empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.flush_interval == 0 {
            return Err(ConfigError::Invalid("flush_interval must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn mode(&self) -> DurabilityMode {
        DurabilityMode::from_resumable(self.resumable)
    }

    pub fn store_path(&self) -> PathBuf {
        self.storage_folder.join(Config::STORE_FILE)
    }
}
