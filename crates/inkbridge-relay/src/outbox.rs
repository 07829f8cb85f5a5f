use inkbridge_core::ConnectionId;

/// Why a frame could not be handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("send queue full")]
    QueueFull,
    #[error("unknown connection")]
    UnknownConnection,
}

/// Send capability provided by the transport.
///
/// Implementations must never block: a peer that cannot accept a frame right
/// now is reported as a failure and the relay treats it as disconnected.
/// Callers that can wait check [`Outbox::capacity`] before sending.
pub trait Outbox: Send + Sync {
    fn send(&self, to: &ConnectionId, text: String) -> Result<(), SendError>;

    /// Tear down the transport for a peer the relay has given up on.
    fn close(&self, id: &ConnectionId);

    /// Free slots in the peer's send queue. `None` when the transport does not
    /// bound its queues or does not know the peer.
    fn capacity(&self, _to: &ConnectionId) -> Option<usize> {
        None
    }
}
