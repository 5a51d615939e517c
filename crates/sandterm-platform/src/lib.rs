//! Seam between the session controller and whatever actually runs the
//! sandboxed shell.

use std::path::PathBuf;

use sandterm_core::{SessionId, TerminalSize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Starts one sandboxed shell per session.
pub trait SandboxLauncher: Send + Sync {
    /// Launches a shell attached to a pseudo-terminal of the given size.
    ///
    /// Resource limits and network isolation are fixed by the backend and are
    /// not supplied by the caller.
    fn spawn(&self, session_id: SessionId, size: TerminalSize)
    -> Result<SandboxProcess, SpawnError>;
}

/// Operations on a running sandbox process.
///
/// Every method returns immediately and is safe to call after the process
/// has exited.
pub trait SandboxControl: Send {
    /// Queues bytes for the process input stream.
    fn write(&mut self, bytes: &[u8]);

    /// Adjusts the pseudo-terminal geometry.
    fn resize(&mut self, size: TerminalSize);

    /// Requests termination. Repeated calls are no-ops.
    fn terminate(&mut self);
}

/// Output and lifecycle notifications produced by a sandbox process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxEvent {
    /// A chunk of terminal output, in production order.
    Output(Vec<u8>),
    /// The process ended. Sent exactly once, after all output.
    Exited {
        /// Exit code when the backend could determine one.
        code: Option<u32>,
    },
}

/// Handle to a newly spawned sandbox process.
pub struct SandboxProcess {
    /// Spawned process id when available.
    pub pid: Option<u32>,
    /// Input, resize and termination controls.
    pub control: Box<dyn SandboxControl>,
    /// Output chunks followed by a single exit notification.
    pub events: mpsc::Receiver<SandboxEvent>,
}

/// Reasons a sandbox could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The container runtime executable is missing or unusable.
    #[error("sandbox runtime unavailable at {path}: {reason}")]
    RuntimeUnavailable { path: PathBuf, reason: String },
    /// The shell used to launch the runtime is missing or unusable.
    #[error("launch shell unavailable at {path}: {reason}")]
    ShellUnavailable { path: PathBuf, reason: String },
    /// Allocating the pseudo-terminal or starting the process failed.
    #[error("failed to {action}: {detail}")]
    Launch { action: &'static str, detail: String },
}
