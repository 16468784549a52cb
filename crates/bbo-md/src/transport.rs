//! Single WebSocket connection feeding a [`ChannelSource`].
//!
//! A `WsFeed` runs as a tokio task that:
//! 1. Connects to the stream URL (TLS).
//! 2. Forwards every text frame, in order, to a crossbeam channel.
//! 3. Answers server pings.
//! 4. Ends on close, error, or shutdown. It never reconnects; a new capture
//!    run is the caller's decision.
//!
//! Dropping the channel sender is how end-of-stream reaches the ingestion
//! loop.

use crossbeam_channel::{Sender, TrySendError};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::source::{ChannelSource, FeedItem, TransportError};

/// Capacity of the transport → ingestion channel.
pub const FEED_CHANNEL_CAPACITY: usize = 8192;

/// A WebSocket feed managed by a background tokio task.
pub struct WsFeed {
    url: String,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsFeed {
    /// Create a new (not yet started) feed.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), shutdown_tx: None, task: None }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Spawn the connection task and return the source it feeds.
    ///
    /// Must be called inside a multi-threaded tokio runtime: when the
    /// channel is full the task blocks in place rather than dropping frames.
    pub fn start(&mut self) -> ChannelSource {
        let (tx, rx) = crossbeam_channel::bounded::<FeedItem>(FEED_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let url = self.url.clone();

        self.task = Some(tokio::spawn(async move {
            connection_loop(url, tx, shutdown_rx).await;
        }));
        self.shutdown_tx = Some(shutdown_tx);

        ChannelSource::new(rx)
    }

    /// Close the connection and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Connect, then pump frames until close, error, or shutdown.
async fn connection_loop(url: String, tx: Sender<FeedItem>, mut shutdown_rx: watch::Receiver<bool>) {
    info!("[ws] connecting to {url}");

    let ws_stream = tokio::select! {
        res = tokio_tungstenite::connect_async(url.as_str()) => match res {
            Ok((stream, _response)) => stream,
            Err(e) => {
                error!("[ws] connection failed: {e}");
                let _ = tx.send(Err(TransportError::Connect(e.to_string())));
                return;
            }
        },
        _ = shutdown_rx.changed() => {
            info!("[ws] shutdown before connect");
            return;
        }
    };
    info!("[ws] connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("[ws] shutdown signal received");
                let _ = ws_write.close().await;
                return;
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !forward(&tx, Ok(text.to_string())) {
                            debug!("[ws] ingestion side gone, closing");
                            let _ = ws_write.close().await;
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("[ws] received close frame: {frame:?}");
                        return;
                    }
                    Some(Err(e)) => {
                        error!("[ws] read error: {e}");
                        forward(&tx, Err(TransportError::Read(e.to_string())));
                        return;
                    }
                    None => {
                        warn!("[ws] stream ended without close frame");
                        forward(&tx, Err(TransportError::Dropped));
                        return;
                    }
                    _ => {} // Binary, Pong, Frame: ignored
                }
            }
        }
    }
}

/// Push one item to the ingestion channel, applying backpressure when full.
/// Returns `false` once the receiver is gone.
fn forward(tx: &Sender<FeedItem>, item: FeedItem) -> bool {
    match tx.try_send(item) {
        Ok(()) => true,
        Err(TrySendError::Full(item)) => {
            warn!("[ws] feed channel full, blocking");
            tokio::task::block_in_place(|| tx.send(item)).is_ok()
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}
