//! Ingestion loop: the single control loop of the capture process.
//!
//! One iteration per inbound message:
//!
//! ```text
//! source.next_message() ──► TickDecoder::decode ──► Record ──► AppendLog::append
//!          │                        │
//!          │ Err: stop run          └─ Err: warn, count, continue
//!          └ None: end of stream
//! ```
//!
//! Malformed messages never terminate capture. Store errors
//! (`CapacityExceeded`) are fatal and returned to the caller. The loop runs on
//! the calling thread and blocks inside the source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bbo_core::error::StoreError;
use bbo_core::store::{AppendLog, Region};
use bbo_core::time_util;
use tracing::{debug, error, info, warn};

use crate::binance::TickDecoder;
use crate::source::MessageSource;

/// Why a run ended without a store error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    TransportFailed(String),
    Cancelled,
}

/// Counters and outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub received: u64,
    pub appended: u64,
    pub skipped: u64,
    pub stop: StopReason,
}

/// Periodic side effects of the loop.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Log progress every N appends (0 disables).
    pub progress_every: u64,
    /// Request an async flush every N appends (0 disables).
    pub flush_every: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { progress_every: 100, flush_every: 0 }
    }
}

/// Wall-clock source for messages without an embedded event time.
pub type Clock = Box<dyn FnMut() -> i64 + Send>;

/// Drives a [`MessageSource`] into an [`AppendLog`].
pub struct IngestLoop<S, R: Region> {
    label: String,
    source: S,
    decoder: TickDecoder,
    store: AppendLog<R>,
    options: IngestOptions,
    clock: Clock,
    cancel: Arc<AtomicBool>,
}

impl<S: MessageSource, R: Region> IngestLoop<S, R> {
    pub fn new(label: impl Into<String>, source: S, decoder: TickDecoder, store: AppendLog<R>) -> Self {
        Self {
            label: label.into(),
            source,
            decoder,
            store,
            options: IngestOptions::default(),
            clock: Box::new(time_util::now_ms),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: impl FnMut() -> i64 + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that stops the loop before the next message when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn store(&self) -> &AppendLog<R> {
        &self.store
    }

    /// Release the loop and hand back the store, e.g. to close it.
    pub fn into_store(self) -> AppendLog<R> {
        self.store
    }

    /// Run until end-of-stream, transport failure, cancellation, or a store
    /// error.
    pub fn run(&mut self) -> Result<IngestReport, StoreError> {
        let label = self.label.as_str();
        let mut received = 0u64;
        let mut appended = 0u64;
        let mut skipped = 0u64;

        info!("[{label}] ingestion loop started (side={:?}, capacity={})", self.decoder.side(), self.store.capacity());

        let stop = loop {
            if self.cancel.load(Ordering::Acquire) {
                break StopReason::Cancelled;
            }

            let raw = match self.source.next_message() {
                Ok(Some(raw)) => raw,
                Ok(None) if self.cancel.load(Ordering::Acquire) => break StopReason::Cancelled,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    warn!("[{label}] transport failed: {e}");
                    break StopReason::TransportFailed(e.to_string());
                }
            };
            received += 1;

            let update = match self.decoder.decode(&raw, (self.clock)()) {
                Ok(update) => update,
                Err(e) => {
                    skipped += 1;
                    warn!("[{label}] skipping message: {e}");
                    debug!("[{label}] raw: {raw}");
                    continue;
                }
            };

            let record = update.to_record();
            match self.store.append(&record) {
                Ok(index) => debug!("[{label}] slot {index}: {record}"),
                Err(e) => {
                    error!("[{label}] append failed after {appended} records: {e}");
                    return Err(e);
                }
            }
            appended += 1;

            if self.options.progress_every > 0 && appended % self.options.progress_every == 0 {
                info!("[{label}] recorded {appended} updates ({} slots left)", self.store.remaining());
            }
            if self.options.flush_every > 0
                && appended % self.options.flush_every == 0
                && let Err(e) = self.store.flush_async()
            {
                warn!("[{label}] async flush failed: {e}");
            }
        };

        info!("[{label}] ingestion loop exited: {stop:?} (received={received}, appended={appended}, skipped={skipped})");
        Ok(IngestReport { received, appended, skipped, stop })
    }
}
