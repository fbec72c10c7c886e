//! Live snapshot subscription
//!
//! A background task holds the WebSocket open and forwards every decoded
//! snapshot through a channel. The subscription is single use: once the
//! socket closes it reports `Closed` and never reconnects.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::message::decode_snapshot;
use crate::error::TransportError;
use crate::models::Snapshot;

/// Buffered events between the socket task and the consumer
const EVENT_BUFFER: usize = 64;

/// Connection status of the live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    /// Socket is being opened
    Connecting,
    /// Socket is open and snapshots may arrive
    Connected,
    /// Socket is gone for good
    Closed,
}

/// Events delivered by a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// Connection status changed
    Status(LiveStatus),
    /// A full replacement snapshot arrived
    Snapshot(Snapshot),
    /// The connection ended; no more events follow
    Closed { reason: Option<String> },
}

/// Handle to a running snapshot subscription
///
/// Dropping the handle aborts the background task, so the socket is released
/// on every exit path. `close` does the same but lets the task send a close
/// frame first.
pub struct SnapshotSubscription {
    events: mpsc::Receiver<SubscriptionEvent>,
    status_rx: watch::Receiver<LiveStatus>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SnapshotSubscription {
    /// Open a subscription against a WebSocket URL
    ///
    /// Returns immediately; connection progress is reported through
    /// `Status` events.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (status_tx, status_rx) = watch::channel(LiveStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(socket_task(url, shutdown_rx, event_tx, status_tx));

        Self {
            events: event_rx,
            status_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Wrap an existing event channel (in-memory transports)
    pub fn from_channel(
        events: mpsc::Receiver<SubscriptionEvent>,
        status_rx: watch::Receiver<LiveStatus>,
    ) -> Self {
        Self {
            events,
            status_rx,
            shutdown: None,
            task: None,
        }
    }

    /// Wait for the next event; `None` once the channel is exhausted
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Wait for the next snapshot, skipping status events
    ///
    /// Returns `None` once the subscription has closed.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        loop {
            match self.events.recv().await? {
                SubscriptionEvent::Snapshot(snapshot) => return Some(snapshot),
                SubscriptionEvent::Closed { .. } => return None,
                SubscriptionEvent::Status(_) => {}
            }
        }
    }

    /// Current connection status
    pub fn status(&self) -> LiveStatus {
        *self.status_rx.borrow()
    }

    /// Watch connection status changes
    pub fn subscribe_status(&self) -> watch::Receiver<LiveStatus> {
        self.status_rx.clone()
    }

    /// Close the socket and wait for the task to finish
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Background task owning the socket
async fn socket_task(
    url: String,
    mut shutdown_rx: oneshot::Receiver<()>,
    event_tx: mpsc::Sender<SubscriptionEvent>,
    status_tx: watch::Sender<LiveStatus>,
) {
    publish_status(&event_tx, &status_tx, LiveStatus::Connecting).await;

    let reason = match run_socket(&url, &mut shutdown_rx, &event_tx, &status_tx).await {
        Ok(reason) => {
            info!("Live update socket closed ({})", url);
            reason
        }
        Err(e) => {
            warn!("Live update socket failed: {}", e);
            Some(e.to_string())
        }
    };

    let _ = status_tx.send(LiveStatus::Closed);
    let _ = event_tx
        .send(SubscriptionEvent::Status(LiveStatus::Closed))
        .await;
    let _ = event_tx.send(SubscriptionEvent::Closed { reason }).await;
}

/// Connect and forward snapshots until the socket ends or shutdown is requested
///
/// Returns the close reason sent by the server, if any.
async fn run_socket(
    url: &str,
    shutdown_rx: &mut oneshot::Receiver<()>,
    event_tx: &mpsc::Sender<SubscriptionEvent>,
    status_tx: &watch::Sender<LiveStatus>,
) -> Result<Option<String>, TransportError> {
    debug!("Connecting to {}", url);
    let ws_stream = tokio::select! {
        connected = connect_async(url) => {
            let (ws_stream, _response) = connected
                .map_err(|e| TransportError::Socket(format!("connect to {} failed: {}", url, e)))?;
            ws_stream
        }
        _ = &mut *shutdown_rx => return Ok(None),
    };

    info!("Live update socket connected to {}", url);
    publish_status(event_tx, status_tx, LiveStatus::Connected).await;

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                debug!("Closing live update socket");
                write.close().await.ok();
                return Ok(None);
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => forward_frame(text.as_bytes(), event_tx).await,
                    Some(Ok(Message::Binary(data))) => forward_frame(&data, event_tx).await,
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(frame
                            .map(|f| f.reason.to_string())
                            .filter(|reason| !reason.is_empty()));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(TransportError::Socket(e.to_string())),
                    None => return Ok(None),
                }
            }
        }
    }
}

/// Decode a frame and pass it on; malformed frames are logged and dropped
async fn forward_frame(bytes: &[u8], event_tx: &mpsc::Sender<SubscriptionEvent>) {
    match decode_snapshot(bytes) {
        Ok(snapshot) => {
            debug!("Received snapshot with {} record(s)", snapshot.len());
            let _ = event_tx.send(SubscriptionEvent::Snapshot(snapshot)).await;
        }
        Err(e) => {
            warn!("Dropping malformed snapshot message: {}", e);
        }
    }
}

async fn publish_status(
    event_tx: &mpsc::Sender<SubscriptionEvent>,
    status_tx: &watch::Sender<LiveStatus>,
    status: LiveStatus,
) {
    let _ = status_tx.send(status);
    let _ = event_tx.send(SubscriptionEvent::Status(status)).await;
}
