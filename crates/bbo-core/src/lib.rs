//! # bbo-core
//!
//! Storage core of the BBO capture log:
//!
//! - **Types** (`types`): the 64-byte [`Record`], its codec, [`Side`]
//! - **Store** (`store`): bounded append-only log over a memory-mapped file
//! - **Reader** (`reader`): read-only log access, summary statistics, report table
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): typed errors via thiserror
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **CPU affinity** (`cpu_affinity`): pinning the ingestion thread
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod cpu_affinity;
pub mod error;
pub mod logging;
pub mod reader;
pub mod store;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
