use thiserror::Error;

/// Failures while exchanging messages with a client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// WebSocket protocol or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
    /// The gateway already closed this connection.
    #[error("connection already closed")]
    Closed,
}
