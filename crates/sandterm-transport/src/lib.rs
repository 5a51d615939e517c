//! Duplex message transport between terminal clients and the gateway.

mod error;

pub mod connection;
pub mod server;
pub mod ws;

pub use connection::{CloseKind, Connection, Frame};
pub use error::TransportError;
pub use server::{ConnectionHandler, router, serve};
pub use ws::WsConnection;
