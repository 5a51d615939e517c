//! Per-connection session controller.
//!
//! A session pairs one client connection with one sandbox process. All of its
//! event sources (client frames, sandbox output, sandbox exit, idle expiry)
//! are polled from a single loop, so only one transition or forward-path
//! write is ever in flight for a session.

use std::{sync::Arc, time::Duration};

use sandterm_core::{ClientMessage, IDLE_TIMEOUT, Inbound, SessionId, TerminalSize, decode};
use sandterm_platform::{SandboxControl, SandboxEvent, SandboxLauncher, SandboxProcess, SpawnError};
use sandterm_transport::{CloseKind, Connection, Frame};
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::watchdog::Watchdog;

/// Upper bound on delivering a notice or close frame while tearing down.
const SEND_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Sandbox is being provisioned.
    Connecting,
    /// Bytes are bridged in both directions.
    Active,
    /// A terminating trigger fired; resources are being released.
    Closing,
    /// Process and connection are both released.
    Closed,
}

/// The event that ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The sandbox could not be started.
    SpawnFailed,
    /// The client went away; `clean` when it sent an orderly close frame.
    ClientClosed { clean: bool },
    /// The sandbox process ended on its own.
    ProcessExited { code: Option<u32> },
    /// No inbound client activity for the idle threshold.
    IdleTimeout,
    /// Receiving from or sending to the client failed.
    TransportError,
}

/// Tunables for a session. Production code uses the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub trigger: Trigger,
    pub state: SessionState,
    /// Bytes written to the sandbox input stream.
    pub bytes_in: u64,
    /// Bytes forwarded to the client.
    pub bytes_out: u64,
    pub resizes: u64,
    /// Terminal geometry last applied to the sandbox.
    pub size: TerminalSize,
}

pub struct SessionController {
    session_id: SessionId,
    connection: Box<dyn Connection>,
    launcher: Arc<dyn SandboxLauncher>,
    settings: SessionSettings,
    state: SessionState,
    size: TerminalSize,
    last_activity: Instant,
    watchdog: Watchdog,
    bytes_in: u64,
    bytes_out: u64,
    resizes: u64,
}

impl SessionController {
    pub fn new(
        session_id: SessionId,
        connection: Box<dyn Connection>,
        launcher: Arc<dyn SandboxLauncher>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            session_id,
            connection,
            launcher,
            settings,
            state: SessionState::Connecting,
            size: TerminalSize::default(),
            last_activity: Instant::now(),
            watchdog: Watchdog::new(),
            bytes_in: 0,
            bytes_out: 0,
            resizes: 0,
        }
    }

    /// Drives the session to completion.
    pub async fn run(mut self) -> SessionReport {
        let launcher = Arc::clone(&self.launcher);
        let (session_id, size) = (self.session_id, self.size);
        let spawned = tokio::task::spawn_blocking(move || launcher.spawn(session_id, size))
            .await
            .unwrap_or_else(|err| {
                Err(SpawnError::Launch {
                    action: "run sandbox launcher",
                    detail: err.to_string(),
                })
            });

        let process = match spawned {
            Ok(process) => process,
            Err(err) => {
                warn!(session_id = self.session_id.0, error = %err, "sandbox spawn failed");
                self.send_notice(&spawn_diagnostic(&err)).await;
                self.shutdown(Trigger::SpawnFailed, None).await;
                return self.report(Trigger::SpawnFailed);
            }
        };

        let SandboxProcess {
            pid,
            mut control,
            mut events,
        } = process;
        info!(
            session_id = self.session_id.0,
            pid = ?pid,
            cols = self.size.cols,
            rows = self.size.rows,
            "sandbox spawned"
        );

        self.state = SessionState::Active;
        self.watchdog.arm(self.settings.idle_timeout);
        self.last_activity = Instant::now();

        let trigger = loop {
            tokio::select! {
                frame = self.connection.recv() => match frame {
                    Some(Ok(Frame::Payload(payload))) => {
                        self.touch();
                        self.apply(decode(payload), control.as_mut());
                    }
                    Some(Ok(Frame::KeepAlive)) => {}
                    Some(Ok(Frame::Close { code })) => {
                        break Trigger::ClientClosed { clean: Frame::is_clean_close(code) };
                    }
                    Some(Err(err)) => {
                        warn!(session_id = self.session_id.0, error = %err, "client receive failed");
                        break Trigger::TransportError;
                    }
                    None => break Trigger::ClientClosed { clean: false },
                },
                event = events.recv() => match event {
                    Some(SandboxEvent::Output(chunk)) => {
                        let len = chunk.len() as u64;
                        // A client that stops reading must not outlive the idle deadline.
                        tokio::select! {
                            sent = self.connection.send_output(chunk) => {
                                if let Err(err) = sent {
                                    warn!(session_id = self.session_id.0, error = %err, "client send failed");
                                    break Trigger::TransportError;
                                }
                                self.bytes_out += len;
                            }
                            () = self.watchdog.expired() => {
                                warn!(session_id = self.session_id.0, "client stopped reading output");
                                break Trigger::IdleTimeout;
                            }
                        }
                    }
                    Some(SandboxEvent::Exited { code }) => break Trigger::ProcessExited { code },
                    None => break Trigger::ProcessExited { code: None },
                },
                () = self.watchdog.expired() => break Trigger::IdleTimeout,
            }
        };

        self.shutdown(trigger, Some(control.as_mut())).await;
        drop(events);
        self.report(trigger)
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.watchdog.reset();
    }

    fn apply(&mut self, inbound: Inbound, control: &mut dyn SandboxControl) {
        match inbound {
            Inbound::Control(ClientMessage::Resize { cols, rows }) => {
                let size = TerminalSize::new(cols, rows);
                debug!(session_id = self.session_id.0, cols, rows, "resize");
                self.size = size;
                self.resizes += 1;
                control.resize(size);
            }
            Inbound::Control(ClientMessage::Input { data }) => {
                self.bytes_in += data.len() as u64;
                control.write(data.as_bytes());
            }
            Inbound::Raw(bytes) => {
                debug!(
                    session_id = self.session_id.0,
                    bytes = bytes.len(),
                    "unrecognized payload forwarded as raw input"
                );
                self.bytes_in += bytes.len() as u64;
                control.write(&bytes);
            }
        }
    }

    /// Releases the watchdog, the process and the connection. Every step is
    /// issued regardless of which trigger fired; `control` is absent only when
    /// no sandbox was ever started.
    async fn shutdown(&mut self, trigger: Trigger, control: Option<&mut dyn SandboxControl>) {
        self.state = SessionState::Closing;
        self.watchdog.cancel();
        if let Some(control) = control {
            control.terminate();
        }

        match trigger {
            Trigger::SpawnFailed => {
                self.close_connection(CloseKind::Error, "sandbox unavailable")
                    .await;
            }
            Trigger::IdleTimeout => {
                info!(
                    session_id = self.session_id.0,
                    idle_secs = self.last_activity.elapsed().as_secs(),
                    "session idle; closing"
                );
                self.send_notice(&idle_notice(self.settings.idle_timeout))
                    .await;
                self.close_connection(CloseKind::Normal, "idle timeout").await;
            }
            Trigger::ProcessExited { code } => {
                debug!(session_id = self.session_id.0, code = ?code, "sandbox exited");
                self.close_connection(CloseKind::Normal, "session ended").await;
            }
            Trigger::ClientClosed { clean } => {
                debug!(session_id = self.session_id.0, clean, "client disconnected");
                self.close_connection(CloseKind::Normal, "client closed").await;
            }
            Trigger::TransportError => {
                self.close_connection(CloseKind::Error, "transport error").await;
            }
        }

        self.state = SessionState::Closed;
    }

    async fn send_notice(&mut self, text: &str) {
        match timeout(SEND_GRACE, self.connection.send_notice(text)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(session_id = self.session_id.0, error = %err, "notice not delivered");
            }
            Err(_) => debug!(session_id = self.session_id.0, "notice timed out"),
        }
    }

    async fn close_connection(&mut self, kind: CloseKind, reason: &str) {
        match timeout(SEND_GRACE, self.connection.close(kind, reason)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(session_id = self.session_id.0, error = %err, "connection close failed");
            }
            Err(_) => debug!(session_id = self.session_id.0, "connection close timed out"),
        }
    }

    fn report(&self, trigger: Trigger) -> SessionReport {
        SessionReport {
            session_id: self.session_id,
            trigger,
            state: self.state,
            bytes_in: self.bytes_in,
            bytes_out: self.bytes_out,
            resizes: self.resizes,
            size: self.size,
        }
    }
}

fn spawn_diagnostic(err: &SpawnError) -> String {
    let reason = match err {
        SpawnError::RuntimeUnavailable { .. } => "the sandbox runtime is unavailable".to_string(),
        SpawnError::ShellUnavailable { .. } => "the launch shell is unavailable".to_string(),
        SpawnError::Launch { action, .. } => format!("could not {action}"),
    };
    format!("\r\n\x1b[1;31mUnable to start a sandbox session:\x1b[0m {reason}.\r\n")
}

fn idle_notice(idle_timeout: Duration) -> String {
    format!(
        "\r\n\x1b[33mSession closed after {} minutes of inactivity.\x1b[0m\r\n",
        idle_timeout.as_secs() / 60
    )
}
