//! `GridspaceServer` builder and server loop.
//!
//! This is the entry point for running the realtime layer. It ties
//! together all the layers: transport → protocol → session → arena.

use std::sync::Arc;
use std::time::Duration;

use gridspace_arena::{ArenaManager, DEFAULT_CHANNEL_SIZE};
use gridspace_protocol::{Codec, JsonCodec};
use gridspace_session::{SessionRegistry, SpaceDirectory, TokenValidator};
use gridspace_transport::{DEFAULT_HANDSHAKE_TIMEOUT, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{DEFAULT_OUTBOUND_QUEUE_SIZE, GridspaceError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here is locked: per-space state lives in the space actors.
pub(crate) struct ServerState<V: TokenValidator, D: SpaceDirectory, C: Codec> {
    pub(crate) registry: Arc<SessionRegistry<V, D>>,
    pub(crate) codec: C,
    pub(crate) outbound_queue_size: usize,
}

/// Builder for configuring and starting a Gridspace server.
///
/// # Example
///
/// ```rust,ignore
/// use gridspace::prelude::*;
///
/// let server = GridspaceServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(JwtValidator::new(secret), directory)
///     .await?;
/// server.run().await
/// ```
pub struct GridspaceServerBuilder {
    bind_addr: String,
    space_channel_size: usize,
    handshake_timeout: Duration,
    outbound_queue_size: usize,
}

impl GridspaceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            space_channel_size: DEFAULT_CHANNEL_SIZE,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            outbound_queue_size: DEFAULT_OUTBOUND_QUEUE_SIZE,
        }
    }

    /// Takes the listener address, timeouts and queue depths from `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .bind(&config.bind_addr)
            .space_channel_size(config.space_channel_size)
            .handshake_timeout(config.handshake_timeout)
            .outbound_queue_size(config.outbound_queue_size)
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the command queue depth of each space actor.
    pub fn space_channel_size(mut self, size: usize) -> Self {
        self.space_channel_size = size;
        self
    }

    /// Sets how long a new peer gets to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets how many events may wait for one connection's socket. A
    /// connection whose queue fills is dropped from its space.
    pub fn outbound_queue_size(mut self, size: usize) -> Self {
        self.outbound_queue_size = size;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<V: TokenValidator, D: SpaceDirectory>(
        self,
        validator: V,
        directory: D,
    ) -> Result<GridspaceServer<V, D, JsonCodec>, GridspaceError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);

        let arena = ArenaManager::with_channel_size(self.space_channel_size);
        let state = Arc::new(ServerState {
            registry: Arc::new(SessionRegistry::new(validator, directory, arena)),
            codec: JsonCodec,
            outbound_queue_size: self.outbound_queue_size.max(1),
        });

        Ok(GridspaceServer { transport, state })
    }
}

impl Default for GridspaceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gridspace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GridspaceServer<V: TokenValidator, D: SpaceDirectory, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<V, D, C>>,
}

impl<V, D, C> GridspaceServer<V, D, C>
where
    V: TokenValidator,
    D: SpaceDirectory,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> GridspaceServerBuilder {
        GridspaceServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The live space runtimes. Clone it before [`run`](Self::run) to
    /// observe the server from outside.
    pub fn arena(&self) -> &ArenaManager {
        self.state.registry.arena()
    }

    /// Runs the accept loop.
    ///
    /// The loop only accepts TCP. The WebSocket upgrade and everything
    /// after it run in a task per connection, so a peer that never
    /// finishes its handshake holds up nobody else. Runs until the
    /// process is terminated.
    pub async fn run(self) -> Result<(), GridspaceError> {
        tracing::info!("Gridspace server running");

        loop {
            match self.transport.accept_pending().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let addr = pending.peer_addr();
                        let conn = match pending.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%addr, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
