//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// A `Decode` error on an inbound frame is what the gateway reports to
/// the client as a protocol error: the frame was not JSON, had an
/// unknown `type`, or its payload failed the schema.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types (e.g. a fractional coordinate), or an
    /// unknown message type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is not valid at this point of the session,
    /// e.g. a `move` before `join`, or a second `join`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
