//! CALL routing
//!
//! Maps an inbound CALL to exactly one reply frame carrying the same
//! messageId. Dispatch is stateless: nothing about the charge point is
//! remembered between messages.
//!
//! | Action | Reply | Payload status |
//! |--------|-------|----------------|
//! | BootNotification | CALLRESULT | Accepted |
//! | StatusNotification | CALLRESULT | Accepted |
//! | anything else | CALLERROR | Rejected |

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::messages::{Frame, FrameError, MessageType};
use super::types::*;

/// Actions the central system knows how to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BootNotification,
    StatusNotification,
    Unknown(String),
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "BootNotification" => Action::BootNotification,
            "StatusNotification" => Action::StatusNotification,
            other => Action::Unknown(other.to_string()),
        }
    }
}

/// Anything that is not a string names no known action
impl From<&Value> for Action {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(name) => Action::from(name.as_str()),
            other => Action::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Unknown(name) => f.write_str(name),
            known => write!(f, "{:?}", known),
        }
    }
}

/// Turns inbound CALL frames into reply frames
#[derive(Debug, Clone)]
pub struct Dispatcher {
    heartbeat_interval: u32,
}

impl Dispatcher {
    pub fn new(heartbeat_interval: u32) -> Self {
        Self { heartbeat_interval }
    }

    /// Dispatch using the current wall-clock time
    pub fn dispatch(&self, frame: &Frame) -> Result<Option<Frame>, FrameError> {
        self.dispatch_at(frame, Utc::now())
    }

    /// Dispatch a frame, stamping replies with `now`.
    ///
    /// Returns `None` for frames that are not CALLs.
    pub fn dispatch_at(
        &self,
        frame: &Frame,
        now: DateTime<Utc>,
    ) -> Result<Option<Frame>, FrameError> {
        if !frame.is_call() {
            debug!(
                "Ignoring {:?} frame {} ({})",
                frame.message_type,
                frame.message_id,
                frame.action_name()
            );
            return Ok(None);
        }

        let reply = match Action::from(&frame.action) {
            Action::BootNotification => Frame::new(
                MessageType::CallResult,
                frame.message_id.as_str(),
                frame.action.clone(),
                BootNotificationConf {
                    status: RegistrationStatus::Accepted,
                    current_time: now,
                    interval: self.heartbeat_interval,
                },
            )?,
            Action::StatusNotification => Frame::new(
                MessageType::CallResult,
                frame.message_id.as_str(),
                frame.action.clone(),
                StatusNotificationConf {
                    status: RegistrationStatus::Accepted,
                    current_time: now,
                    heartbeat_interval: self.heartbeat_interval,
                },
            )?,
            Action::Unknown(name) => {
                debug!("Rejecting unsupported action {}", name);
                Frame::new(
                    MessageType::CallError,
                    frame.message_id.as_str(),
                    frame.action.clone(),
                    RejectedConf {
                        status: RegistrationStatus::Rejected,
                        current_time: now,
                        heartbeat_interval: self.heartbeat_interval,
                    },
                )?
            }
        };

        Ok(Some(reply))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(300)
    }
}
