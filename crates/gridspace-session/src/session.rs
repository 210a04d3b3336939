//! Per-connection session: the `Connected -> Joined -> Left` machine.
//!
//! ```text
//!   Connected ──(join ok)──→ Joined ──(leave / drop)──→ Left
//!       │                                                ↑
//!       └───────────────(leave / drop)───────────────────┘
//! ```
//!
//! A failed join leaves the session in `Connected`. `Left` is terminal.
//! Leaving is idempotent and happens exactly once per session, either
//! explicitly or when the session is dropped.

use std::sync::Arc;

use gridspace_arena::{ArenaError, MoveOutcome, OccupantSender, SpaceHandle};
use gridspace_protocol::{Position, SpaceId, UserId};
use gridspace_transport::ConnectionId;

use crate::{SessionError, SessionRegistry, SpaceDirectory, TokenValidator};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Transport is up; no identity yet.
    Connected,

    /// Authenticated and present in a space.
    Joined {
        space_id: SpaceId,
        user_id: UserId,
        /// Direct line to the space's actor.
        handle: SpaceHandle,
    },

    /// Gone. Accepts no further commands.
    Left,
}

/// One connection's session. Owned by that connection's task.
pub struct ConnectionSession<V: TokenValidator, D: SpaceDirectory> {
    conn_id: ConnectionId,
    sender: OccupantSender,
    state: SessionState,
    registry: Arc<SessionRegistry<V, D>>,
}

impl<V: TokenValidator, D: SpaceDirectory> ConnectionSession<V, D> {
    pub(crate) fn new(conn_id: ConnectionId, sender: OccupantSender, registry: Arc<SessionRegistry<V, D>>) -> Self {
        Self {
            conn_id,
            sender,
            state: SessionState::Connected,
            registry,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The joined user's id, once joined.
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.state {
            SessionState::Joined { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Joins a space.
    ///
    /// Checks, in order: the token; that the space exists; that the
    /// arena can place the occupant. Only when all pass does the session
    /// become `Joined`. On success the arena has already sent
    /// `space-joined` to this connection and `user-joined` to the others.
    pub async fn join(&mut self, space_id: SpaceId, token: &str) -> Result<Position, SessionError> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Joined { .. } => return Err(SessionError::AlreadyJoined),
            SessionState::Left => return Err(SessionError::Closed),
        }

        let user_id = self.registry.validator.validate(token).await?;
        let layout = self
            .registry
            .directory
            .get_space(&space_id)
            .await
            .ok_or_else(|| SessionError::SpaceNotFound(space_id.clone()))?;

        let (handle, spawn) = self
            .registry
            .arena
            .join(&space_id, &layout, self.conn_id, user_id.clone(), self.sender.clone())
            .await?;

        tracing::info!(conn_id = %self.conn_id, %space_id, %user_id, %spawn, "session joined");
        self.state = SessionState::Joined {
            space_id,
            user_id,
            handle,
        };
        Ok(spawn)
    }

    /// Requests a one-cell step to `(x, y)`.
    ///
    /// The outcome has already been delivered to the clients when this
    /// returns; it is also returned for the caller's benefit.
    pub async fn move_to(&self, x: i64, y: i64) -> Result<MoveOutcome, SessionError> {
        match &self.state {
            SessionState::Joined { handle, .. } => Ok(handle.move_to(self.conn_id, x, y).await?),
            SessionState::Connected => Err(SessionError::NotJoined),
            SessionState::Left => Err(SessionError::Closed),
        }
    }

    /// Moves the session to `Left`, deregistering it from its space.
    ///
    /// Returns `true` if this call took the occupant out of a space.
    /// Calling it again does nothing.
    pub async fn leave(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, SessionState::Left);
        let SessionState::Joined {
            space_id, handle, ..
        } = previous
        else {
            return false;
        };

        leave_space(&handle, self.conn_id).await;
        tracing::info!(conn_id = %self.conn_id, %space_id, "session left");
        true
    }
}

impl<V: TokenValidator, D: SpaceDirectory> Drop for ConnectionSession<V, D> {
    /// Guarantees the leave path runs even if the connection task ends
    /// without calling [`leave`](ConnectionSession::leave), e.g. on a
    /// panic. `Drop` is synchronous, so the leave is spawned.
    fn drop(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Left);
        if let SessionState::Joined { handle, .. } = previous {
            let conn_id = self.conn_id;
            if let Ok(rt) = tokio::runtime::Handle::try_current() {
                rt.spawn(async move { leave_space(&handle, conn_id).await });
            }
        }
    }
}

/// Removes `conn_id` from the space behind `handle`.
///
/// The occupant may already be gone (evicted after a failed send, or the
/// space was released); that is the same end state, so it is not an
/// error.
async fn leave_space(handle: &SpaceHandle, conn_id: ConnectionId) {
    match handle.leave(conn_id).await {
        Ok(()) => {}
        Err(e @ (ArenaError::NotInSpace(..) | ArenaError::Unavailable(_))) => {
            tracing::debug!(%conn_id, error = %e, "occupant already gone");
        }
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "leave failed");
        }
    }
}
