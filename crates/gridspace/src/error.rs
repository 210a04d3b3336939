//! Unified error type for Gridspace.

use gridspace_arena::ArenaError;
use gridspace_protocol::ProtocolError;
use gridspace_session::SessionError;
use gridspace_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `gridspace` crate you deal with this single error type
/// instead of importing errors from each layer. The `#[from]` attribute
/// on each variant lets `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GridspaceError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (token, space lookup, lifecycle).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An arena-level error (full, unavailable, bad dimensions).
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// Reading a configuration input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
