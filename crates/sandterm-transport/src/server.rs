use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::{Connection, TransportError, WsConnection};

/// Serves one accepted connection until the session behind it ends.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, connection: Box<dyn Connection>);
}

/// Routes WebSocket upgrades on `/` and `/ws`, plus a `/health` probe.
pub fn router(handler: Arc<dyn ConnectionHandler>) -> Router {
    Router::new()
        .route("/", get(upgrade))
        .route("/ws", get(upgrade))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(handler)
}

/// Accepts connections until `shutdown` resolves.
///
/// Each connection runs on its own task, so a stalled or failing session
/// never blocks the listener or its neighbours.
pub async fn serve<F>(
    listener: TcpListener,
    handler: Arc<dyn ConnectionHandler>,
    shutdown: F,
) -> Result<(), TransportError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(handler): State<Arc<dyn ConnectionHandler>>,
) -> Response {
    ws.on_failed_upgrade(|err| debug!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            handler.handle(Box::new(WsConnection::new(socket))).await;
        })
}
