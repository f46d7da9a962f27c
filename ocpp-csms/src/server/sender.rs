//! Best-effort reply writer
//!
//! A reply is written at most once and only while the connection is open.
//! Nothing is buffered or retried.

use std::fmt;

use futures_util::{Sink, SinkExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use crate::config::ReplyFormat;
use crate::ocpp::{Frame, FrameError};

/// Liveness of a charge point connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done, replies may be written
    Open,
    /// Close frame seen from the peer
    Closing,
    /// Transport gone
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection is {0}, not open")]
    NotOpen(ConnectionState),

    #[error("failed to encode reply: {0}")]
    Encode(#[from] FrameError),

    #[error("transport write failed: {0}")]
    Transport(String),
}

/// Writes reply frames to one connection's sink
pub struct ReplySender<S> {
    sink: S,
    state: ConnectionState,
    format: ReplyFormat,
}

impl<S> ReplySender<S>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    /// Wrap the write half of a freshly opened connection
    pub fn new(sink: S, format: ReplyFormat) -> Self {
        Self {
            sink,
            state: ConnectionState::Open,
            format,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    /// Write one frame if the connection is open
    pub async fn send(&mut self, frame: &Frame) -> Result<(), SendError> {
        if self.state != ConnectionState::Open {
            warn!(
                "Socket not ready ({}), dropping reply {}",
                self.state, frame.message_id
            );
            return Err(SendError::NotOpen(self.state));
        }

        let text = frame.to_text(self.format).map_err(|e| {
            error!("Failed to serialize reply {}: {}", frame.message_id, e);
            SendError::from(e)
        })?;

        debug!("Sending: {}", text);

        if let Err(e) = self.sink.send(Message::text(text)).await {
            error!("Failed to send WebSocket message: {}", e);
            self.state = ConnectionState::Closed;
            return Err(SendError::Transport(e.to_string()));
        }

        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}
