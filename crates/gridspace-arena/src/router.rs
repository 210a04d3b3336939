//! Fan-out of server events to the occupants of one space.

use std::collections::HashMap;

use gridspace_protocol::ServerMessage;
use gridspace_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Channel into a connection's outbound writer task.
///
/// Bounded, and only ever written with `try_send`: the space actor never
/// waits on a socket. A writer that is gone or too far behind shows up
/// as a failed send.
pub type OccupantSender = mpsc::Sender<ServerMessage>;

/// Who should receive an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every occupant of the space.
    All,
    /// Exactly one connection.
    Only(ConnectionId),
    /// Everyone except one connection.
    AllExcept(ConnectionId),
}

impl Recipient {
    fn includes(self, conn_id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => target == conn_id,
            Self::AllExcept(excluded) => excluded != conn_id,
        }
    }
}

/// Per-space table of outbound channels.
#[derive(Debug, Default)]
pub(crate) struct Router {
    senders: HashMap<ConnectionId, OccupantSender>,
}

impl Router {
    pub(crate) fn insert(&mut self, conn_id: ConnectionId, sender: OccupantSender) {
        self.senders.insert(conn_id, sender);
    }

    pub(crate) fn remove(&mut self, conn_id: ConnectionId) {
        self.senders.remove(&conn_id);
    }

    /// Delivers each event to its recipients, best-effort.
    ///
    /// A failed send never stops delivery to the rest. Returns the
    /// connections whose channel is closed or full, without duplicates,
    /// so the caller can treat them as disconnected. Once a connection
    /// has failed it gets nothing further from this call.
    pub(crate) fn dispatch(&self, events: Vec<(Recipient, ServerMessage)>) -> Vec<ConnectionId> {
        let mut broken = Vec::new();
        for (recipient, event) in events {
            for (conn_id, sender) in &self.senders {
                if !recipient.includes(*conn_id) || broken.contains(conn_id) {
                    continue;
                }
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(%conn_id, "outbound queue full");
                        broken.push(*conn_id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(%conn_id, "outbound channel closed");
                        broken.push(*conn_id);
                    }
                }
            }
        }
        broken
    }
}
