//! Shared types for the sandboxed terminal gateway: session ids, terminal
//! geometry, the inbound message codec and the fixed sandbox policy.

pub mod ids;
pub mod policy;
pub mod protocol;

pub use ids::SessionId;
pub use policy::{IDLE_TIMEOUT, SANDBOX_POLICY, SandboxPolicy};
pub use protocol::{ClientMessage, Inbound, TerminalSize, decode};
