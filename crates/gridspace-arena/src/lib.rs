//! Real-time arena engine for Gridspace.
//!
//! Each live space runs as an isolated Tokio task (actor model) that is
//! the sole owner of its occupant table. Every join, move and leave for
//! that space is a command on the actor's channel, so mutations are
//! applied one at a time and nobody ever observes a half-applied move.
//! Different spaces are different actors and never wait on each other.
//!
//! # Key types
//!
//! - [`ArenaManager`] — finds or lazily creates a space's actor, and
//!   forgets it once the last occupant leaves
//! - [`SpaceHandle`] — send commands to a running space actor
//! - [`SpaceRuntime`] — the occupant table plus the spawn and movement
//!   rules, as plain synchronous code
//! - [`SpaceLayout`] — grid dimensions and static obstacles
//! - [`Recipient`] — who a fan-out event goes to

mod engine;
mod error;
mod layout;
mod manager;
mod router;
mod space;

pub use engine::{MoveOutcome, MoveRejection, Occupant, SpaceRuntime};
pub use error::ArenaError;
pub use layout::SpaceLayout;
pub use manager::{ArenaManager, DEFAULT_CHANNEL_SIZE};
pub use router::{OccupantSender, Recipient};
pub use space::{OccupantSnapshot, SpaceHandle, SpaceSnapshot};
