//! Axum `WebSocket` implementation of `poker_core::transport::FramedChannel`.
//!
//! `poker-core` only ever sees the trait objects; this module is the
//! only place that knows a websocket frame from anything else.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use poker_core::transport::{ChannelError, ChannelReader, ChannelWriter, FramedChannel};

pub struct WebSocketChannel {
    socket: WebSocket,
}

impl WebSocketChannel {
    pub fn new(socket: WebSocket) -> Self {
        WebSocketChannel { socket }
    }
}

impl FramedChannel for WebSocketChannel {
    fn split(self: Box<Self>) -> (Box<dyn ChannelReader>, Box<dyn ChannelWriter>) {
        let (sink, stream) = self.socket.split();
        (
            Box::new(WebSocketReader { stream }),
            Box::new(WebSocketWriter { sink }),
        )
    }
}

struct WebSocketReader {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl ChannelReader for WebSocketReader {
    async fn recv(&mut self) -> Result<String, ChannelError> {
        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or(ChannelError::ClosedNormal)?
                .map_err(|e| ChannelError::Other(e.to_string()))?;

            match message {
                Message::Text(text) => return Ok(text.to_string()),
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(frame) => {
                    return Err(close_frame_error(frame));
                }
            }
        }
    }
}

fn close_frame_error(frame: Option<CloseFrame>) -> ChannelError {
    match frame {
        Some(frame) if frame.code == 1000 => ChannelError::ClosedNormal,
        Some(frame) if frame.code == 1001 => ChannelError::GoingAway,
        Some(frame) => ChannelError::Other(format!("closed with code {}", frame.code)),
        None => ChannelError::ClosedNormal,
    }
}

struct WebSocketWriter {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl ChannelWriter for WebSocketWriter {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Other(e.to_string()))
    }

    async fn ping(&mut self) -> Result<(), ChannelError> {
        self.sink
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| ChannelError::Other(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}
