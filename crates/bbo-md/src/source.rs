//! Message sources: the transport boundary seen by the ingestion loop.
//!
//! A [`MessageSource`] yields raw text messages in arrival order, one per
//! quote update, blocking until the next one is available. `Ok(None)` is
//! end-of-stream; `Err` is a transport failure that ends the run.

use std::io::BufRead;

use crossbeam_channel::Receiver;
use thiserror::Error;
use tracing::warn;

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("read failed: {0}")]
    Read(String),

    /// The connection went away without a close handshake.
    #[error("connection dropped")]
    Dropped,
}

/// Item carried from a transport task to the ingestion loop.
pub type FeedItem = Result<String, TransportError>;

/// Ordered, blocking source of raw feed messages.
pub trait MessageSource {
    fn next_message(&mut self) -> Result<Option<String>, TransportError>;
}

impl<S: MessageSource + ?Sized> MessageSource for &mut S {
    fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        (**self).next_message()
    }
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        (**self).next_message()
    }
}

/// Source fed by a transport task over a crossbeam channel. The stream ends
/// when every sender is dropped.
pub struct ChannelSource {
    rx: Receiver<FeedItem>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<FeedItem>) -> Self {
        Self { rx }
    }
}

impl MessageSource for ChannelSource {
    fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        match self.rx.recv() {
            Ok(Ok(text)) => Ok(Some(text)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}

/// Newline-delimited messages from a reader, e.g. a recorded feed file.
/// Blank lines are skipped. A line that is not valid UTF-8 is passed on
/// lossily converted, so the decoder rejects it like any other bad message.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new() }
    }
}

impl<R: BufRead> MessageSource for LineSource<R> {
    fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf).map_err(|e| TransportError::Read(e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }
            let line = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    warn!("[replay] line is not valid UTF-8: {e}");
                    String::from_utf8_lossy(&self.buf).trim().to_string()
                }
            };
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
    }
}

/// In-memory source over any iterator of feed items.
pub struct IterSource<I> {
    items: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = FeedItem>,
{
    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        Self { items: items.into_iter() }
    }
}

impl<I> MessageSource for IterSource<I>
where
    I: Iterator<Item = FeedItem>,
{
    fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        self.items.next().transpose()
    }
}
