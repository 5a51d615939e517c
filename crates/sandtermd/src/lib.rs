//! Sandboxed terminal gateway daemon: one container-backed shell per
//! WebSocket connection.

pub mod config;
pub mod dispatch;
pub mod session;
pub mod watchdog;

pub use config::{Args, GatewayConfig};
pub use dispatch::SessionDispatcher;
pub use session::{SessionController, SessionReport, SessionSettings, SessionState, Trigger};
pub use watchdog::Watchdog;
