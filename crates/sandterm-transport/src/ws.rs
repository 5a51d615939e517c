use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use tracing::debug;

use crate::{CloseKind, Connection, Frame, TransportError};

/// [`Connection`] over an upgraded axum WebSocket.
pub struct WsConnection {
    socket: WebSocket,
    closed: bool,
}

impl WsConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.socket.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = self.socket.recv().await?;
        Some(message.map(to_frame).map_err(TransportError::from))
    }

    async fn send_output(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.send(Message::Binary(bytes)).await
    }

    async fn send_notice(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(Message::Text(text.to_string())).await
    }

    async fn close(&mut self, kind: CloseKind, reason: &str) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let frame = CloseFrame {
            code: kind.code(),
            reason: reason.to_string().into(),
        };
        debug!(code = frame.code, reason, "closing websocket");
        self.socket.send(Message::Close(Some(frame))).await?;
        Ok(())
    }
}

fn to_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Payload(text.into_bytes()),
        Message::Binary(bytes) => Frame::Payload(bytes),
        Message::Ping(_) | Message::Pong(_) => Frame::KeepAlive,
        Message::Close(frame) => Frame::Close {
            code: frame.map(|frame| frame.code),
        },
    }
}
