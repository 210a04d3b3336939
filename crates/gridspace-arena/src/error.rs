//! Error types for the arena layer.

use gridspace_protocol::SpaceId;
use gridspace_transport::ConnectionId;

/// Errors that can occur during arena operations.
///
/// A rejected move is not an error; see [`MoveOutcome`](crate::MoveOutcome).
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// Every cell of the space is taken; there is nowhere to spawn.
    #[error("space {0} has no free cell")]
    SpaceFull(SpaceId),

    /// The connection already occupies this space.
    #[error("{0} is already in space {1}")]
    AlreadyInSpace(ConnectionId, SpaceId),

    /// The connection does not occupy this space.
    #[error("{0} is not in space {1}")]
    NotInSpace(ConnectionId, SpaceId),

    /// The space's actor has shut down (it emptied and was released).
    #[error("space {0} is unavailable")]
    Unavailable(SpaceId),

    /// A `"<W>x<H>"` dimensions string could not be parsed.
    #[error("invalid dimensions {0:?}")]
    InvalidDimensions(String),
}
