//! Connection sessions for Gridspace.
//!
//! This crate sits between the gateway and the arena:
//!
//! 1. **Authentication** — turning a join token into a [`UserId`]
//!    ([`TokenValidator`] trait, [`JwtValidator`])
//! 2. **Space lookup** — reading a space's bounds from the store
//!    ([`SpaceDirectory`] trait, [`InMemorySpaceDirectory`])
//! 3. **Lifecycle** — the per-connection state machine
//!    `Connected -> Joined -> Left` ([`ConnectionSession`]), created by
//!    the shared [`SessionRegistry`]
//!
//! ```text
//! Gateway (above)  ← one ConnectionSession per connection task
//!     ↕
//! Session Layer (this crate)  ← validates, looks up, orchestrates join/leave
//!     ↕
//! Arena Layer (below)  ← authoritative positions and fan-out
//! ```
//!
//! [`UserId`]: gridspace_protocol::UserId

#![allow(async_fn_in_trait)]

mod auth;
mod directory;
mod error;
mod registry;
mod session;

pub use auth::{JwtValidator, TokenValidator};
pub use directory::{InMemorySpaceDirectory, SpaceDirectory, SpaceRecord};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{ConnectionSession, SessionState};
