//! Per charge point session
//!
//! Each accepted socket is owned by one task. Inbound messages are handled
//! strictly one after another: decode, dispatch, encode, send.

use std::fmt;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;

use futures_util::{Sink, Stream, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    accept_hdr_async_with_config,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Error as WsError, Message,
    },
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::gate::ClientId;
use super::sender::{ConnectionState, ReplySender, SendError};
use super::ServerContext;
use crate::ocpp::{Dispatcher, Frame};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[from] WsError),
}

/// One live charge point session
pub struct ChargePointConnection<S> {
    client_id: ClientId,
    dispatcher: Dispatcher,
    sender: ReplySender<S>,
}

impl<S> ChargePointConnection<S>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    pub fn new(client_id: ClientId, dispatcher: Dispatcher, sender: ReplySender<S>) -> Self {
        Self {
            client_id,
            dispatcher,
            sender,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// Consume inbound messages until the peer closes or the transport fails
    pub async fn run<R>(&mut self, mut inbound: R)
    where
        R: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        while let Some(message) = inbound.next().await {
            match message {
                Ok(message) => {
                    if self.on_message(message).await.is_break() {
                        break;
                    }
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    self.sender.set_state(ConnectionState::Closed);
                    break;
                }
            }
        }

        if self.sender.state() == ConnectionState::Open {
            self.sender.set_state(ConnectionState::Closed);
        }
        info!("Connection closed ({})", self.client_id);
    }

    /// Handle one WebSocket message
    pub async fn on_message(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Text(text) => self.on_frame(text.as_bytes()).await,
            Message::Binary(data) => self.on_frame(&data).await,
            Message::Close(frame) => {
                info!("Close received: {:?}", frame);
                self.sender.set_state(ConnectionState::Closing);
                ControlFlow::Break(())
            }
            // Ping/Pong are answered by the transport
            _ => ControlFlow::Continue(()),
        }
    }

    async fn on_frame(&mut self, bytes: &[u8]) -> ControlFlow<()> {
        debug!("Received: {}", String::from_utf8_lossy(bytes));

        let frame = match Frame::parse(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    "Failed to parse message: {:?}, {}",
                    String::from_utf8_lossy(bytes),
                    e
                );
                return ControlFlow::Continue(());
            }
        };

        let reply = match self.dispatcher.dispatch(&frame) {
            Ok(Some(reply)) => reply,
            Ok(None) => return ControlFlow::Continue(()),
            Err(e) => {
                error!("Failed to build reply for {}: {}", frame.message_id, e);
                return ControlFlow::Continue(());
            }
        };

        match self.sender.send(&reply).await {
            Err(SendError::Transport(_)) => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    pub fn into_sender(self) -> ReplySender<S> {
        self.sender
    }
}

/// Run the handshake and then the session for one accepted TCP stream
pub(crate) async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) -> Result<(), ConnectionError> {
    let mut admitted = None;

    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match context.gate.admit(request, response) {
            Ok((client_id, response)) => {
                admitted = Some(client_id);
                Ok(response)
            }
            Err(e) => {
                warn!(
                    "Refusing {} from {}: {}, returning {}",
                    request.uri().path(),
                    peer,
                    e,
                    e.status()
                );
                Err(e.to_response())
            }
        }
    };

    let ws_config = Some(context.ws_config.clone());
    let ws = match accept_hdr_async_with_config(stream, callback, ws_config).await {
        Ok(ws) => ws,
        // Refusal already logged by the gate
        Err(WsError::Http(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let Some(client_id) = admitted else {
        return Ok(());
    };

    let span = info_span!(
        "connection",
        client_id = %client_id,
        session = %Uuid::new_v4()
    );

    async move {
        info!("Charge point connected from {}", peer);

        let (ws_tx, ws_rx) = ws.split();
        let sender = ReplySender::new(ws_tx, context.reply_format);
        let mut connection =
            ChargePointConnection::new(client_id, context.dispatcher.clone(), sender);

        connection.run(ws_rx).await;
    }
    .instrument(span)
    .await;

    Ok(())
}
