//! # Gridspace
//!
//! Real-time presence and movement for shared 2-D grid spaces.
//!
//! Clients connect over WebSocket, `join` a space with a bearer token, and
//! `move` one cell at a time. Each space is owned by a single actor that
//! serializes every join, move and leave, and fans the resulting events
//! out to the space's occupants.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridspace::prelude::*;
//!
//! # async fn run() -> Result<(), GridspaceError> {
//! let directory = InMemorySpaceDirectory::new();
//! directory
//!     .insert(SpaceId::from("lobby"), SpaceLayout::new(100, 200))
//!     .await;
//!
//! let server = GridspaceServer::<JwtValidator, InMemorySpaceDirectory, gridspace_protocol::JsonCodec>::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(JwtValidator::new(b"shared-secret"), directory)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    DEFAULT_OUTBOUND_QUEUE_SIZE, ENV_BIND, ENV_HANDSHAKE_TIMEOUT_SECS, ENV_JWT_REQUIRE_EXP, ENV_JWT_SECRET,
    ENV_OUTBOUND_QUEUE_SIZE, ENV_SPACE_CHANNEL_SIZE, ENV_SPACES, ServerConfig, load_catalogue,
};
pub use error::GridspaceError;
pub use server::{GridspaceServer, GridspaceServerBuilder};

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when that is unset.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub mod prelude {
    pub use crate::{GridspaceError, GridspaceServer, GridspaceServerBuilder, ServerConfig};
    pub use gridspace_arena::{ArenaManager, MoveOutcome, MoveRejection, SpaceLayout, SpaceSnapshot};
    pub use gridspace_protocol::{ClientMessage, ErrorCode, OccupantView, Position, ServerMessage, SpaceId, UserId};
    pub use gridspace_session::{
        InMemorySpaceDirectory, JwtValidator, SessionError, SpaceDirectory, SpaceRecord, TokenValidator,
    };
}
