use std::{
    io::{ErrorKind, Read, Write},
    path::PathBuf,
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self as std_mpsc, SyncSender, TrySendError},
    },
    thread,
};

use portable_pty::{Child, ChildKiller, MasterPty, PtySize};
use sandterm_core::{SessionId, TerminalSize};
use sandterm_platform::{SandboxControl, SandboxEvent, SpawnError};
use tokio::sync::mpsc;

use crate::launcher::launch_error;

/// Output chunks buffered between the PTY reader and the session.
///
/// When the session falls behind, the reader blocks and the sandbox process
/// stalls on its own terminal writes.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;
/// Input chunks queued for the PTY writer before new input is dropped.
const INPUT_QUEUE_CAPACITY: usize = 256;
const READ_CHUNK_SIZE: usize = 4096;

pub(crate) struct PtyControl {
    session_id: SessionId,
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    input: SyncSender<Vec<u8>>,
    exited: Arc<AtomicBool>,
    terminated: bool,
    runtime_path: PathBuf,
    container: String,
}

impl PtyControl {
    pub(crate) fn start(
        session_id: SessionId,
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        runtime_path: PathBuf,
        container: String,
    ) -> Result<(Self, mpsc::Receiver<SandboxEvent>), SpawnError> {
        let killer = child.clone_killer();
        let reader = master
            .try_clone_reader()
            .map_err(|err| launch_error("clone pty reader", err.to_string()))?;
        let writer = master
            .take_writer()
            .map_err(|err| launch_error("take pty writer", err.to_string()))?;

        let exited = Arc::new(AtomicBool::new(false));
        let (event_tx, events) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        spawn_reader_thread(session_id, reader, child, event_tx, Arc::clone(&exited))?;
        let input = spawn_writer_thread(session_id, writer)?;

        Ok((
            Self {
                session_id,
                master,
                killer,
                input,
                exited,
                terminated: false,
                runtime_path,
                container,
            },
            events,
        ))
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Kills the container by name from a helper thread. Returns immediately.
    fn stop_container(&self) {
        let session_id = self.session_id.0;
        let runtime_path = self.runtime_path.clone();
        let container = self.container.clone();

        let stopper = thread::Builder::new()
            .name("sandterm-stop".to_string())
            .spawn(move || {
                let status = Command::new(&runtime_path)
                    .arg("kill")
                    .arg(&container)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
                if let Err(err) = status {
                    tracing::debug!(
                        session_id,
                        container = %container,
                        error = %err,
                        "container stop request failed"
                    );
                }
            });
        if let Err(err) = stopper {
            tracing::debug!(session_id, error = %err, "could not start container stop");
        }
    }
}

impl SandboxControl for PtyControl {
    fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        match self.input.try_send(bytes.to_vec()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(
                    session_id = self.session_id.0,
                    bytes = dropped.len(),
                    "sandbox input queue full; dropping input"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(
                    session_id = self.session_id.0,
                    "sandbox input closed; discarding input"
                );
            }
        }
    }

    fn resize(&mut self, size: TerminalSize) {
        if self.has_exited() {
            return;
        }

        if let Err(err) = self.master.resize(pty_size(size)) {
            tracing::debug!(
                session_id = self.session_id.0,
                error = %err,
                "resize pty failed"
            );
        }
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if self.has_exited() {
            return;
        }

        if let Err(err) = self.killer.kill() {
            tracing::debug!(
                session_id = self.session_id.0,
                error = %err,
                "kill sandbox shell failed"
            );
        }
        self.stop_container();
    }
}

impl Drop for PtyControl {
    fn drop(&mut self) {
        self.terminate();
    }
}

pub(crate) fn pty_size(size: TerminalSize) -> PtySize {
    let size = size.clamped();
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn spawn_reader_thread(
    session_id: SessionId,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    events: mpsc::Sender<SandboxEvent>,
    exited: Arc<AtomicBool>,
) -> Result<(), SpawnError> {
    thread::Builder::new()
        .name(format!("sandterm-pty-{}", session_id.0))
        .spawn(move || {
            let mut buf = [0_u8; READ_CHUNK_SIZE];

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if events
                            .blocking_send(SandboxEvent::Output(buf[..n].to_vec()))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }

            let code = match child.wait() {
                Ok(status) => Some(status.exit_code()),
                Err(err) => {
                    tracing::debug!(session_id = session_id.0, error = %err, "wait failed");
                    None
                }
            };
            exited.store(true, Ordering::Release);
            let _ = events.blocking_send(SandboxEvent::Exited { code });
        })
        .map(|_| ())
        .map_err(|err| launch_error("start pty reader", err.to_string()))
}

fn spawn_writer_thread(
    session_id: SessionId,
    mut writer: Box<dyn Write + Send>,
) -> Result<SyncSender<Vec<u8>>, SpawnError> {
    let (input, queue) = std_mpsc::sync_channel::<Vec<u8>>(INPUT_QUEUE_CAPACITY);

    thread::Builder::new()
        .name(format!("sandterm-pty-in-{}", session_id.0))
        .spawn(move || {
            for chunk in queue {
                let written = writer.write_all(&chunk).and_then(|()| writer.flush());
                if let Err(err) = written {
                    tracing::debug!(session_id = session_id.0, error = %err, "write pty input failed");
                    break;
                }
            }
        })
        .map_err(|err| launch_error("start pty writer", err.to_string()))?;

    Ok(input)
}
