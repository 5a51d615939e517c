use async_trait::async_trait;

use crate::TransportError;

/// One inbound unit from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Client payload, text or binary, as raw bytes.
    Payload(Vec<u8>),
    /// Transport keep-alive traffic. Not client activity.
    KeepAlive,
    /// The client sent a close frame.
    Close {
        /// Close code supplied by the client, if any.
        code: Option<u16>,
    },
}

impl Frame {
    /// True for close frames that signal an orderly shutdown. A close frame
    /// without a status code counts as orderly.
    pub fn is_clean_close(code: Option<u16>) -> bool {
        matches!(code, None | Some(1000 | 1001))
    }
}

/// Why the gateway is closing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Orderly end of session.
    Normal,
    /// The session could not be served.
    Error,
}

impl CloseKind {
    /// WebSocket close code for this kind.
    pub fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Error => 1011,
        }
    }
}

/// A client connection exclusively owned by one session.
#[async_trait]
pub trait Connection: Send {
    /// Waits for the next client frame; `None` once the stream has ended.
    ///
    /// Must be cancel safe: it is raced against other session events.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Sends terminal output bytes unmodified.
    async fn send_output(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Sends a human-readable message to the client.
    async fn send_notice(&mut self, text: &str) -> Result<(), TransportError>;

    /// Closes the connection. Closing an already closed connection is a no-op.
    async fn close(&mut self, kind: CloseKind, reason: &str) -> Result<(), TransportError>;
}
