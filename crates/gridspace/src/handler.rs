//! Per-connection handler: command parsing and routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound queue. The
//! flow is:
//!   1. Open a session in `Connected`
//!   2. Loop: receive frames → decode → `join` / `move` through the session
//!   3. On close or transport loss → leave the space, exactly once
//!
//! Malformed frames and refused commands are answered with an `error`
//! event; the connection stays open.

use std::sync::Arc;

use gridspace_protocol::{ClientMessage, Codec, ErrorCode, ServerMessage};
use gridspace_session::{ConnectionSession, SpaceDirectory, TokenValidator};
use gridspace_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GridspaceError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, D, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<V, D, C>>,
) -> Result<(), GridspaceError>
where
    V: TokenValidator,
    D: SpaceDirectory,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, rx) = mpsc::channel(state.outbound_queue_size);
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    // The session leaves its space on drop too, so a panic below still
    // deregisters the occupant.
    let mut session = state.registry.open(conn_id, tx.clone());
    let result = read_loop(&conn, &state, &mut session, &tx).await;

    session.leave().await;
    drop(session);
    drop(tx);
    writer.abort();
    let _ = conn.close().await;

    tracing::debug!(%conn_id, "connection finished");
    result
}

/// Receives frames until the peer goes away.
async fn read_loop<V, D, C>(
    conn: &WebSocketConnection,
    state: &ServerState<V, D, C>,
    session: &mut ConnectionSession<V, D>,
    tx: &mpsc::Sender<ServerMessage>,
) -> Result<(), GridspaceError>
where
    V: TokenValidator,
    D: SpaceDirectory,
    C: Codec,
{
    let conn_id = conn.id();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                send_error(tx, ErrorCode::BAD_REQUEST, format!("invalid message: {e}"));
                continue;
            }
        };

        let result = match msg {
            ClientMessage::Join { space_id, token } => session.join(space_id, &token).await.map(drop),
            ClientMessage::Move { x, y } => session.move_to(x, y).await.map(drop),
        };

        if let Err(e) = result {
            tracing::debug!(%conn_id, error = %e, "command refused");
            send_error(tx, e.code(), e.to_string());
        }
    }
}

/// Encodes queued events and writes them to the socket, in order.
///
/// Ends when every sender is gone or the socket refuses a frame. Once it
/// ends, or falls a full queue behind, the arena's next send to this
/// connection fails and evicts it.
async fn write_loop<V, D, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<V, D, C>>,
    mut rx: mpsc::Receiver<ServerMessage>,
) where
    V: TokenValidator,
    D: SpaceDirectory,
    C: Codec,
{
    let conn_id = conn.id();

    while let Some(msg) = rx.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Queues an `error` event for the client.
fn send_error(tx: &mpsc::Sender<ServerMessage>, code: ErrorCode, message: String) {
    // A full queue means the client is not reading; the next space event
    // for it evicts the connection. A closed one means the writer is gone.
    if let Err(e) = tx.try_send(ServerMessage::error(code, message)) {
        tracing::debug!(error = %e, "error event dropped");
    }
}
