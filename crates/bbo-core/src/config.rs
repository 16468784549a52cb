//! Configuration for the capture and reader processes.
//!
//! Settings come from an optional JSON file; every field has a default, so an
//! empty object (or no file at all) is a valid configuration. CLI flags in the
//! runner override individual fields after loading.
//!
//! # Example config
//!
//! ```json
//! {
//!   "logging": { "module_name": "bbo_capture", "log_path": "/tmp/log", "log_level": "info" },
//!   "feed": { "url": "wss://stream.binance.com:443/ws", "symbol": "BTCUSDT", "side": "bid" },
//!   "store": { "path": "market_data.bin", "capacity_slots": 1638400, "progress_every": 100 },
//!   "cpu_affinity": 2
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{RECORD_SIZE, Side};

/// Default backing-file size: 100 MiB.
pub const DEFAULT_CAPACITY_BYTES: u64 = 100 * 1024 * 1024;

pub const DEFAULT_FEED_URL: &str = "wss://stream.binance.com:443/ws";
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_LOG_FILE: &str = "market_data.bin";
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub feed: FeedConfig,
    pub store: StoreConfig,
    /// CPU core for the ingestion thread.
    pub cpu_affinity: Option<i32>,
}

/// Logging metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub module_name: Option<String>,
    /// Directory for daily-rotating log files.
    pub log_path: Option<String>,
    pub log_level: Option<String>,
}

impl LoggingConfig {
    pub fn module_name(&self) -> String {
        self.module_name.clone().unwrap_or_else(|| "bbo_capture".to_string())
    }
}

/// Feed (transport) settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WebSocket base URL; the stream name is appended as a path segment.
    pub url: String,
    pub symbol: String,
    /// Which side of the book to capture.
    pub side: Side,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { url: DEFAULT_FEED_URL.to_string(), symbol: DEFAULT_SYMBOL.to_string(), side: Side::Bid }
    }
}

/// Append log settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Capacity in slots. Wins over `capacity_bytes` when both are set.
    pub capacity_slots: Option<u64>,
    /// Capacity in bytes, rounded down to whole slots.
    pub capacity_bytes: Option<u64>,
    /// Log a progress line every N appends (0 disables).
    pub progress_every: u64,
    /// Request an asynchronous flush every N appends (0 disables).
    pub flush_every: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_FILE),
            capacity_slots: None,
            capacity_bytes: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            flush_every: 0,
        }
    }
}

impl StoreConfig {
    /// Effective capacity in slots: `capacity_slots`, else `capacity_bytes`
    /// rounded down, else 100 MiB worth of slots.
    pub fn effective_capacity(&self) -> Result<usize, ConfigError> {
        let slots = match (self.capacity_slots, self.capacity_bytes) {
            (Some(slots), _) => slots,
            (None, Some(bytes)) => bytes / RECORD_SIZE as u64,
            (None, None) => DEFAULT_CAPACITY_BYTES / RECORD_SIZE as u64,
        };
        if slots == 0 {
            return Err(ConfigError::Invalid(format!(
                "store capacity must hold at least one {RECORD_SIZE}-byte record"
            )));
        }
        usize::try_from(slots).map_err(|_| ConfigError::Invalid(format!("store capacity {slots} too large")))
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let config: AppConfig =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    Ok(config)
}
