//! WebSocket listener for charge point connections
//!
//! ```text
//! TcpListener ──accept──► ConnectionGate (handshake)
//!                               │
//!                               ▼
//!                 ChargePointConnection (one task per socket)
//!                   Frame::parse → Dispatcher → ReplySender
//! ```
//!
//! Connections share nothing but the read-only [`ServerContext`].

pub mod gate;
pub mod sender;
pub mod connection;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};

use crate::config::{ReplyFormat, ServerConfig};
use crate::ocpp::Dispatcher;

pub use connection::{ChargePointConnection, ConnectionError};
pub use gate::{ClientId, ConnectionGate, GateError};
pub use sender::{ConnectionState, ReplySender, SendError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read-only state handed to every connection task
pub(crate) struct ServerContext {
    pub(crate) gate: ConnectionGate,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) reply_format: ReplyFormat,
    pub(crate) ws_config: WebSocketConfig,
}

impl ServerContext {
    fn from_config(config: &ServerConfig) -> Self {
        Self {
            gate: ConnectionGate::from_config(config),
            dispatcher: Dispatcher::new(config.heartbeat_interval),
            reply_format: config.reply_format,
            ws_config: WebSocketConfig {
                max_message_size: Some(config.max_message_size),
                max_frame_size: Some(config.max_message_size),
                ..Default::default()
            },
        }
    }
}

/// OCPP 1.6 central system listener
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Bind the listener described by `config`
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        Ok(Self {
            listener,
            context: Arc::new(ServerContext::from_config(&config)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Server is listening on {}", self.local_addr()?);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }

                conn = self.listener.accept() => {
                    let (stream, peer) = match conn {
                        Ok(c) => c,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    debug!("New TCP connection from {}", peer);
                    let context = self.context.clone();
                    tokio::spawn(async move {
                        if let Err(e) = connection::serve(stream, peer, context).await {
                            warn!("Connection from {} failed: {}", peer, e);
                        }
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let first = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let err = Server::bind(ServerConfig::new(addr)).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { addr: a, .. } if a == addr));
    }

    #[tokio::test]
    async fn test_run_until_returns_on_shutdown() {
        let server = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap()))
            .await
            .unwrap();

        server.run_until(async {}).await.unwrap();
    }
}
