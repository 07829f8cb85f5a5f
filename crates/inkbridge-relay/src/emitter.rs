use std::collections::HashMap;
use std::sync::Arc;

use inkbridge_core::{ConnectionId, Frame, Outbound};
use serde_json::Value;

use crate::outbox::{Outbox, SendError};

/// Result of a successful [`CommandEmitter::emit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emitted {
    Sent,
    /// Identical to the last payload this connection received.
    Suppressed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub sent: u64,
    pub suppressed: u64,
}

/// Delivers outbound messages, dropping exact repeats per destination.
///
/// Only JSON payloads take part in deduplication. Plain-text error notices
/// are always sent and leave the remembered payload untouched.
pub struct CommandEmitter {
    outbox: Arc<dyn Outbox>,
    last_sent: HashMap<ConnectionId, Value>,
    stats: EmitterStats,
}

impl CommandEmitter {
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self {
            outbox,
            last_sent: HashMap::new(),
            stats: EmitterStats::default(),
        }
    }

    pub fn emit(&mut self, to: &ConnectionId, message: &Outbound) -> Result<Emitted, SendError> {
        match message.render() {
            Frame::Json(value) => {
                if self.last_sent.get(to) == Some(&value) {
                    self.stats.suppressed += 1;
                    tracing::trace!(connection_id = %to, "suppressed duplicate payload");
                    return Ok(Emitted::Suppressed);
                }
                self.outbox.send(to, value.to_string())?;
                self.last_sent.insert(to.clone(), value);
            }
            Frame::Text(text) => self.outbox.send(to, text)?,
        }
        self.stats.sent += 1;
        Ok(Emitted::Sent)
    }

    /// Drop the dedup history of a connection.
    pub fn forget(&mut self, connection: &ConnectionId) {
        self.last_sent.remove(connection);
    }

    /// Ask the transport to close a connection.
    pub fn close(&self, connection: &ConnectionId) {
        self.outbox.close(connection);
    }

    /// Whether `connection` can take at least one more frame right now.
    pub fn has_room(&self, connection: &ConnectionId) -> bool {
        self.outbox.capacity(connection).map_or(true, |free| free > 0)
    }

    pub fn last_sent(&self, connection: &ConnectionId) -> Option<&Value> {
        self.last_sent.get(connection)
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }
}
