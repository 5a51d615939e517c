use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use sandterm_core::SessionId;
use sandterm_platform::SandboxLauncher;
use sandterm_transport::{Connection, ConnectionHandler};
use tracing::info;

use crate::session::{SessionController, SessionSettings};

/// Gives every accepted connection its own session controller.
pub struct SessionDispatcher {
    launcher: Arc<dyn SandboxLauncher>,
    settings: SessionSettings,
    next_id: AtomicU64,
}

impl SessionDispatcher {
    pub fn new(launcher: Arc<dyn SandboxLauncher>, settings: SessionSettings) -> Self {
        Self {
            launcher,
            settings,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl ConnectionHandler for SessionDispatcher {
    async fn handle(&self, connection: Box<dyn Connection>) {
        let session_id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(session_id = session_id.0, "session accepted");

        let report = SessionController::new(
            session_id,
            connection,
            Arc::clone(&self.launcher),
            self.settings,
        )
        .run()
        .await;

        info!(
            session_id = session_id.0,
            trigger = ?report.trigger,
            bytes_in = report.bytes_in,
            bytes_out = report.bytes_out,
            resizes = report.resizes,
            "session closed"
        );
    }
}

impl From<Arc<dyn SandboxLauncher>> for SessionDispatcher {
    fn from(launcher: Arc<dyn SandboxLauncher>) -> Self {
        Self::new(launcher, SessionSettings::default())
    }
}
