//! OCPP 1.6 protocol layer
//!
//! - `types`: confirmation payloads sent to charge points
//! - `messages`: OCPP-J framing (CALL, CALLRESULT, CALLERROR)
//! - `dispatcher`: routing of inbound CALLs to replies

pub mod types;
pub mod messages;
pub mod dispatcher;

pub use types::*;
pub use messages::*;
pub use dispatcher::{Action, Dispatcher};
