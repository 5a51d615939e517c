use serde::{Deserialize, Serialize};

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl TerminalSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Raises both dimensions to at least one cell.
    pub fn clamped(self) -> Self {
        Self {
            cols: self.cols.max(1),
            rows: self.rows.max(1),
        }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        crate::SANDBOX_POLICY.initial_size
    }
}

/// Control messages a client sends inside a JSON envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Adjusts the pseudo-terminal geometry.
    Resize {
        /// Terminal columns.
        cols: u16,
        /// Terminal rows.
        rows: u16,
    },
    /// Keystrokes or pasted text for the shell.
    Input {
        /// Text written verbatim to the sandbox input stream.
        data: String,
    },
}

/// Classification of one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A recognized control envelope.
    Control(ClientMessage),
    /// Anything else, kept byte-for-byte.
    Raw(Vec<u8>),
}

/// Classifies an inbound payload.
///
/// Payloads that are not JSON, are JSON of another shape, or carry an unknown
/// `type` are returned untouched as [`Inbound::Raw`]. Clients that send bare
/// keystrokes without an envelope rely on this.
pub fn decode(payload: Vec<u8>) -> Inbound {
    match serde_json::from_slice::<ClientMessage>(&payload) {
        Ok(message) => Inbound::Control(message),
        Err(_) => Inbound::Raw(payload),
    }
}
