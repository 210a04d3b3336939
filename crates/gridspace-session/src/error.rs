//! Error types for the session layer.

use gridspace_arena::ArenaError;
use gridspace_protocol::{ErrorCode, SpaceId};

/// Errors that can occur while a connection joins, moves, or leaves.
///
/// None of these leave a half-completed join behind: a failed `join`
/// keeps the connection in `Connected`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token failed verification. Expired, malformed and wrongly
    /// signed tokens all collapse into this one variant.
    #[error("invalid token")]
    InvalidToken,

    /// No persisted space has this id.
    #[error("space {0} not found")]
    SpaceNotFound(SpaceId),

    /// `join` on a connection that already joined. Rejoining needs a new
    /// connection.
    #[error("connection already joined a space")]
    AlreadyJoined,

    /// `move` before a successful `join`.
    #[error("connection has not joined a space")]
    NotJoined,

    /// The session has left; it accepts no further commands.
    #[error("session closed")]
    Closed,

    /// The arena refused the operation.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl SessionError {
    /// The code reported to the client in an `error` event.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidToken => ErrorCode::UNAUTHORIZED,
            Self::SpaceNotFound(_) => ErrorCode::NOT_FOUND,
            Self::AlreadyJoined | Self::NotJoined | Self::Closed => ErrorCode::BAD_REQUEST,
            Self::Arena(ArenaError::SpaceFull(_) | ArenaError::Unavailable(_)) => ErrorCode::UNAVAILABLE,
            Self::Arena(_) => ErrorCode::BAD_REQUEST,
        }
    }
}
