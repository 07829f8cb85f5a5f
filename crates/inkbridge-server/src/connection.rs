use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use inkbridge_core::ConnectionId;
use inkbridge_relay::{Outbox, RelayEvent, SendError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Transport side of one live WebSocket.
struct Peer {
    tx: mpsc::Sender<String>,
    last_pong: AtomicU64,
    closed: CancellationToken,
}

impl Peer {
    fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    fn is_alive(&self, timeout: Duration) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < timeout.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// All open WebSocket connections, keyed by connection id.
///
/// This is the relay's [`Outbox`]: sends are `try_send` into a bounded
/// per-connection queue drained by that connection's writer task.
pub struct ConnectionTable {
    peers: DashMap<ConnectionId, Peer>,
    max_send_queue: usize,
}

impl ConnectionTable {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            peers: DashMap::new(),
            max_send_queue: max_send_queue.max(1),
        }
    }

    /// Register a new connection. The returned token is cancelled when the
    /// connection is closed from this side (or when `parent` is cancelled).
    pub fn register(
        &self,
        parent: &CancellationToken,
    ) -> (ConnectionId, mpsc::Receiver<String>, CancellationToken) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let closed = parent.child_token();
        let peer = Peer {
            tx,
            last_pong: AtomicU64::new(now_secs()),
            closed: closed.clone(),
        };
        self.peers.insert(id.clone(), peer);
        (id, rx, closed)
    }

    /// Drop a connection's entry and signal its tasks to stop.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        match self.peers.remove(id) {
            Some((_, peer)) => {
                peer.closed.cancel();
                true
            }
            None => false,
        }
    }

    pub fn record_pong(&self, id: &ConnectionId) {
        if let Some(peer) = self.peers.get(id) {
            peer.record_pong();
        }
    }

    pub fn count(&self) -> usize {
        self.peers.len()
    }

    /// Close connections that haven't answered a ping within `timeout`.
    pub fn sweep_dead(&self, timeout: Duration) -> Vec<ConnectionId> {
        let dead: Vec<ConnectionId> = self
            .peers
            .iter()
            .filter(|entry| !entry.value().is_alive(timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &dead {
            self.unregister(id);
            tracing::info!(connection_id = %id, "closed unresponsive connection");
        }
        dead
    }
}

impl Outbox for ConnectionTable {
    fn send(&self, to: &ConnectionId, text: String) -> Result<(), SendError> {
        let Some(peer) = self.peers.get(to) else {
            return Err(SendError::UnknownConnection);
        };
        match peer.tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(connection_id = %to, msg_len = msg.len(), "send queue full");
                Err(SendError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }

    fn close(&self, id: &ConnectionId) {
        self.unregister(id);
    }

    fn capacity(&self, to: &ConnectionId) -> Option<usize> {
        self.peers.get(to).map(|peer| peer.tx.capacity())
    }
}

/// Drive one WebSocket: a writer task drains the send queue and pings, a
/// reader task forwards text frames to the dispatcher and records pongs.
///
/// The dispatcher sees `Connected` before any frame of this connection and
/// `Disconnected` after the last one.
pub async fn handle_ws_connection(
    socket: WebSocket,
    id: ConnectionId,
    mut rx: mpsc::Receiver<String>,
    closed: CancellationToken,
    table: Arc<ConnectionTable>,
    events: mpsc::Sender<RelayEvent>,
    heartbeat_interval: Duration,
) {
    if events.send(RelayEvent::Connected(id.clone())).await.is_err() {
        table.unregister(&id);
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_id = id.clone();
    let writer_closed = closed.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(connection_id = %writer_id, "sent ping");
                }
                () = writer_closed.cancelled() => {
                    // Flush what the relay already queued, then say goodbye.
                    while let Ok(text) = rx.try_recv() {
                        if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
            }
        }
        let _ = ws_tx.send(WsMessage::Close(None)).await;
    });

    let reader_id = id.clone();
    let reader_closed = closed.clone();
    let reader_table = Arc::clone(&table);
    let reader_events = events.clone();
    let mut reader = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                msg = ws_rx.next() => msg,
                () = reader_closed.cancelled() => break,
            };
            let Some(Ok(msg)) = msg else { break };
            match msg {
                WsMessage::Text(text) => {
                    let event = RelayEvent::Frame(reader_id.clone(), text.to_string());
                    if reader_events.send(event).await.is_err() {
                        break;
                    }
                }
                WsMessage::Pong(_) => reader_table.record_pong(&reader_id),
                WsMessage::Close(_) => break,
                WsMessage::Binary(data) => {
                    tracing::debug!(connection_id = %reader_id, len = data.len(), "ignoring binary frame");
                }
                WsMessage::Ping(_) => {} // axum answers pings itself
            }
        }
    });

    // Whichever half ends first stops the other; only the survivor is awaited.
    tokio::select! {
        _ = &mut writer => {
            closed.cancel();
            let _ = reader.await;
        }
        _ = &mut reader => {
            closed.cancel();
            let _ = writer.await;
        }
    }

    table.unregister(&id);
    tracing::info!(connection_id = %id, "WebSocket client disconnected");
    let _ = events.send(RelayEvent::Disconnected(id)).await;
}

/// Periodically close connections that stopped answering pings.
pub fn start_sweeper(
    table: Arc<ConnectionTable>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = table.sweep_dead(timeout);
                    if !removed.is_empty() {
                        tracing::info!(removed = removed.len(), "dead connection sweep");
                    }
                }
                () = cancel.cancelled() => break,
            }
        }
    })
}
