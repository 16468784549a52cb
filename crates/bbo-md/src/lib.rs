//! # bbo-md
//!
//! Capture side of the BBO log: turns a live feed into appended records.
//!
//! ## Architecture
//!
//! ```text
//! WsFeed task ──► crossbeam channel ──► ChannelSource ─┐
//! replay file ──────────────────────► LineSource ─────┤
//!                                                      ▼
//!                         IngestLoop: TickDecoder ──► AppendLog
//! ```
//!
//! - [`binance`]: `bookTicker` stream URL and tick decoder
//! - [`source`]: the `MessageSource` transport boundary and its implementations
//! - [`transport`]: WebSocket connection task
//! - [`ingest`]: the blocking receive → decode → append loop
//! - [`json_util`]: JSON parsing helpers

pub mod binance;
pub mod ingest;
pub mod json_util;
pub mod source;
pub mod transport;

pub use binance::{NormalizedUpdate, TickDecoder};
pub use ingest::{IngestLoop, IngestOptions, IngestReport, StopReason};
pub use source::{ChannelSource, IterSource, LineSource, MessageSource, TransportError};
pub use transport::WsFeed;
