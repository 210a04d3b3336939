//! Wire protocol for Gridspace.
//!
//! This crate defines the "language" that clients and the arena server
//! speak over a persistent connection:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Position`], ids) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! Every message is an adjacently tagged JSON object:
//!
//! ```text
//! {"type": "move", "payload": {"x": 4, "y": 7}}
//! ```
//!
//! The protocol layer doesn't know about connections or spaces — it
//! only knows how to serialize and deserialize messages.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, ErrorCode, OccupantView, Position, ServerMessage, SpaceId, UserId};
