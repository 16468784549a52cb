//! Typed error definitions for the BBO capture log.
//!
//! Each failure domain gets its own enum so callers can tell recoverable
//! conditions ([`DecodeError`]) from fatal ones ([`StoreError`], [`OpenError`]).
//! All variants implement `std::error::Error` via `thiserror`, so they
//! integrate with `anyhow::Result` in the binaries.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the append log store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be created, sized, or mapped.
    #[error("storage init failed for {path}: {reason}")]
    StorageInit {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Every slot of the region has been written.
    #[error("capacity exceeded: all {capacity} slots are used")]
    CapacityExceeded { capacity: usize },

    /// Flushing the mapped region failed.
    #[error("flush failed: {0}")]
    Flush(#[source] std::io::Error),
}

impl StoreError {
    pub(crate) fn init(path: impl Into<PathBuf>, reason: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Self::StorageInit { path: path.into(), reason: reason.into(), source }
    }
}

/// Errors raised when a reader opens a log file.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file size is not a whole number of records.
    #[error("{path}: size {size} is not a multiple of the {record_size}-byte record size")]
    Misaligned { path: PathBuf, size: u64, record_size: usize },
}

/// Reasons a raw feed message is rejected by the tick decoder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The message is not well-formed JSON.
    #[error("malformed json: {0}")]
    Json(String),

    /// The message is valid JSON but not an object.
    #[error("message is not a json object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    /// The value parsed but is negative, NaN or infinite.
    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// The resolved event time would collide with the empty-slot sentinel.
    #[error("event time {0} is not a positive epoch timestamp")]
    InvalidTimestamp(i64),
}

/// Configuration parsing or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
