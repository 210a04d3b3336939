//! The registry: shared collaborators every connection session uses.

use std::sync::Arc;

use gridspace_arena::{ArenaManager, OccupantSender};
use gridspace_transport::ConnectionId;

use crate::{ConnectionSession, SpaceDirectory, TokenValidator};

/// Owns the token validator, the space directory and the arena, and
/// hands out one [`ConnectionSession`] per accepted connection.
///
/// Occupant membership itself is not stored here: each space's actor
/// owns its table, and each connection task owns its session. The
/// registry only wires them together.
pub struct SessionRegistry<V: TokenValidator, D: SpaceDirectory> {
    pub(crate) validator: V,
    pub(crate) directory: D,
    pub(crate) arena: ArenaManager,
}

impl<V: TokenValidator, D: SpaceDirectory> SessionRegistry<V, D> {
    pub fn new(validator: V, directory: D, arena: ArenaManager) -> Self {
        Self {
            validator,
            directory,
            arena,
        }
    }

    /// Starts the session for a freshly accepted connection, in the
    /// `Connected` state.
    ///
    /// `sender` feeds the connection's outbound writer; every event for
    /// this connection goes through it.
    pub fn open(self: &Arc<Self>, conn_id: ConnectionId, sender: OccupantSender) -> ConnectionSession<V, D> {
        tracing::debug!(%conn_id, "session opened");
        ConnectionSession::new(conn_id, sender, Arc::clone(self))
    }

    pub fn arena(&self) -> &ArenaManager {
        &self.arena
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}
