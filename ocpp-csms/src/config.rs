//! Configuration for the central system
//!
//! Everything the server needs at startup lives here; nothing is read from the
//! environment.

use std::net::{Ipv4Addr, SocketAddr};

/// Default listening port
pub const DEFAULT_PORT: u16 = 3002;

/// OCPP 1.6 JSON WebSocket subprotocol
pub const OCPP16_SUBPROTOCOL: &str = "ocpp1.6";

/// Shape of outbound replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyFormat {
    /// `[messageTypeId, messageId, action, payload]` for every reply
    #[default]
    Echo,
    /// OCPP-J compliant CALLRESULT and CALLERROR frames
    Standard,
}

impl std::str::FromStr for ReplyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "echo" => Ok(ReplyFormat::Echo),
            "standard" => Ok(ReplyFormat::Standard),
            other => Err(format!("unknown reply format: {}", other)),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub bind_addr: SocketAddr,

    /// Subprotocol the handshake selects when offered
    pub subprotocol: String,

    /// Advisory heartbeat interval in seconds, reported in replies
    pub heartbeat_interval: u32,

    pub reply_format: ReplyFormat,

    /// Refuse handshakes that do not offer the subprotocol instead of
    /// selecting an empty one
    pub strict_subprotocol: bool,

    /// Maximum size of an inbound WebSocket message
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            subprotocol: OCPP16_SUBPROTOCOL.to_string(),
            heartbeat_interval: 300,
            reply_format: ReplyFormat::Echo,
            strict_subprotocol: false,
            max_message_size: 64 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create config listening on the given address
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set listening port, keeping the bind IP
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    pub fn with_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.subprotocol = subprotocol.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, seconds: u32) -> Self {
        self.heartbeat_interval = seconds;
        self
    }

    pub fn with_reply_format(mut self, format: ReplyFormat) -> Self {
        self.reply_format = format;
        self
    }

    /// Reject mismatched subprotocols with 400 Bad Request
    pub fn strict(mut self) -> Self {
        self.strict_subprotocol = true;
        self
    }

    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }
}
