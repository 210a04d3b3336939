/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer did not finish the WebSocket handshake in time.
    #[error("WebSocket handshake with {0} timed out")]
    HandshakeTimeout(std::net::SocketAddr),

    /// Outbound data was not valid UTF-8 and cannot go out as a text frame.
    #[error("outbound frame is not valid UTF-8")]
    NotText,
}
