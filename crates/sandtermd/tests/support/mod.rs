use std::{
    sync::{Arc, Mutex},
    thread::{self, ThreadId},
};

use async_trait::async_trait;
use sandterm_core::{SessionId, TerminalSize};
use sandterm_platform::{
    SandboxControl, SandboxEvent, SandboxLauncher, SandboxProcess, SpawnError,
};
use sandterm_transport::{CloseKind, Connection, Frame, TransportError};
use tokio::sync::mpsc;

/// Calls observed by the fake sandbox, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Spawn(SessionId, TerminalSize),
    Write(Vec<u8>),
    Resize(TerminalSize),
    Terminate,
}

/// Messages the fake connection delivered to the client, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Output(Vec<u8>),
    Notice(String),
    Close(CloseKind, String),
}

pub type Log<T> = Arc<Mutex<Vec<T>>>;

pub fn entries<T: Clone>(log: &Log<T>) -> Vec<T> {
    log.lock().expect("log lock").clone()
}

/// Launcher whose processes are driven by the test through event senders.
pub struct FakeLauncher {
    pub ops: Log<Op>,
    /// Threads each spawn ran on.
    pub spawn_threads: Log<ThreadId>,
    fail: bool,
    events: Mutex<Vec<mpsc::Sender<SandboxEvent>>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ops: Arc::default(),
            spawn_threads: Arc::default(),
            fail: false,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            ops: Arc::default(),
            spawn_threads: Arc::default(),
            fail: true,
            events: Mutex::new(Vec::new()),
        })
    }

    /// Event sender of the most recently spawned process.
    pub fn events(&self) -> mpsc::Sender<SandboxEvent> {
        self.events
            .lock()
            .expect("events lock")
            .last()
            .cloned()
            .expect("a process should have been spawned")
    }
}

impl SandboxLauncher for FakeLauncher {
    fn spawn(
        &self,
        session_id: SessionId,
        size: TerminalSize,
    ) -> Result<SandboxProcess, SpawnError> {
        self.ops
            .lock()
            .expect("ops lock")
            .push(Op::Spawn(session_id, size));
        self.spawn_threads
            .lock()
            .expect("threads lock")
            .push(thread::current().id());
        if self.fail {
            return Err(SpawnError::RuntimeUnavailable {
                path: "/usr/bin/docker".into(),
                reason: "No such file or directory".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(16);
        self.events.lock().expect("events lock").push(tx);
        Ok(SandboxProcess {
            pid: Some(4242),
            control: Box::new(FakeControl {
                ops: Arc::clone(&self.ops),
            }),
            events: rx,
        })
    }
}

struct FakeControl {
    ops: Log<Op>,
}

impl SandboxControl for FakeControl {
    fn write(&mut self, bytes: &[u8]) {
        self.ops
            .lock()
            .expect("ops lock")
            .push(Op::Write(bytes.to_vec()));
    }

    fn resize(&mut self, size: TerminalSize) {
        self.ops.lock().expect("ops lock").push(Op::Resize(size));
    }

    fn terminate(&mut self) {
        self.ops.lock().expect("ops lock").push(Op::Terminate);
    }
}

/// In-memory client connection.
pub struct FakeConnection {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    sent: Log<Sent>,
    outbound: Outbound,
}

/// How the fake connection treats outbound traffic.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Outbound {
    Deliver,
    FailOutput,
    /// Every send parks forever, like a client that stopped reading.
    Stall,
}

/// Test-side ends of a [`FakeConnection`].
pub struct Client {
    pub inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    pub sent: Log<Sent>,
}

impl Client {
    pub fn send(&self, payload: &str) {
        self.frame(Frame::Payload(payload.as_bytes().to_vec()));
    }

    pub fn frame(&self, frame: Frame) {
        self.inbound.send(Ok(frame)).expect("session should be receiving");
    }
}

pub fn connection() -> (Box<dyn Connection>, Client) {
    build_connection(Outbound::Deliver)
}

pub fn connection_failing_output() -> (Box<dyn Connection>, Client) {
    build_connection(Outbound::FailOutput)
}

pub fn connection_not_reading() -> (Box<dyn Connection>, Client) {
    build_connection(Outbound::Stall)
}

fn build_connection(outbound: Outbound) -> (Box<dyn Connection>, Client) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent: Log<Sent> = Arc::default();
    let connection = FakeConnection {
        inbound: rx,
        sent: Arc::clone(&sent),
        outbound,
    };
    (Box::new(connection), Client { inbound: tx, sent })
}

async fn stall(outbound: Outbound) {
    if outbound == Outbound::Stall {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await
    }

    async fn send_output(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        stall(self.outbound).await;
        if self.outbound == Outbound::FailOutput {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "client went away",
            )));
        }
        self.sent.lock().expect("sent lock").push(Sent::Output(bytes));
        Ok(())
    }

    async fn send_notice(&mut self, text: &str) -> Result<(), TransportError> {
        stall(self.outbound).await;
        self.sent
            .lock()
            .expect("sent lock")
            .push(Sent::Notice(text.to_string()));
        Ok(())
    }

    async fn close(&mut self, kind: CloseKind, reason: &str) -> Result<(), TransportError> {
        stall(self.outbound).await;
        self.sent
            .lock()
            .expect("sent lock")
            .push(Sent::Close(kind, reason.to_string()));
        Ok(())
    }
}
