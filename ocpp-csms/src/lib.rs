//! # OCPP 1.6 Central System
//!
//! Server side of OCPP 1.6 JSON over WebSocket: admits charge point
//! connections and answers their CALLs.
//!
//! ## Architecture
//!
//! ```text
//! Charge Point (WebSocket client)
//!       │ ws://host:3002/<clientId>   Sec-WebSocket-Protocol: ocpp1.6
//!       ▼
//! ┌──────────────────────────────────────────┐
//! │    ocpp-csms                             │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │ Connection   │──►│ ChargePoint     │  │
//! │  │ Gate         │   │ Connection task │  │
//! │  └──────────────┘   └───────┬─────────┘  │
//! │        Frame::parse ─► Dispatcher ─► ReplySender
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Routing
//!
//! | Action | Reply | Status |
//! |--------|-------|--------|
//! | BootNotification | CALLRESULT | Accepted |
//! | StatusNotification | CALLRESULT | Accepted |
//! | anything else | CALLERROR | Rejected |
//!
//! Frames that fail to decode get no reply; the connection stays open.
//!
//! ## Usage
//!
//! ```no_run
//! use ocpp_csms::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ocpp;
pub mod server;

pub use config::{ReplyFormat, ServerConfig, DEFAULT_PORT, OCPP16_SUBPROTOCOL};
pub use server::{Server, ServerError};

// Re-export key types
pub use ocpp::{Action, Dispatcher, Frame, FrameError, MessageType};
pub use server::{ClientId, ConnectionGate, ConnectionState, GateError, ReplySender};
