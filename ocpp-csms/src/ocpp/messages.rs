//! OCPP-J message framing
//!
//! Every frame on the wire is a JSON array. Inbound frames are always read as
//! the 4-element shape `[messageTypeId, messageId, action, payload]`.
//! Outbound frames are written according to [`ReplyFormat`]:
//! - `Echo`: `[messageTypeId, messageId, action, payload]`
//! - `Standard`: CALLRESULT `[3, messageId, payload]`,
//!   CALLERROR `[4, messageId, errorCode, errorDescription, errorDetails]`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ReplyFormat;

/// OCPP message type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 2,
    CallResult = 3,
    CallError = 4,
}

impl TryFrom<i64> for MessageType {
    type Error = FrameError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(MessageType::Call),
            3 => Ok(MessageType::CallResult),
            4 => Ok(MessageType::CallError),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

/// OCPP 1.6 CALLERROR codes
///
/// Spellings follow OCPP-J 1.6, including its typos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    OccurenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Errors decoding or encoding a frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON array")]
    NotAnArray,

    #[error("expected 4 elements, got {0}")]
    Arity(usize),

    #[error("messageTypeId is not an integer")]
    InvalidMessageType,

    #[error("unknown messageTypeId: {0}")]
    UnknownMessageType(i64),

    #[error("messageId is not a string")]
    InvalidMessageId,
}

/// A single OCPP frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message_type: MessageType,
    pub message_id: String,
    /// Kept as raw JSON so a non-string action can be echoed back verbatim
    pub action: Value,
    pub payload: Value,
}

impl Frame {
    /// Build a frame from any serializable payload
    pub fn new(
        message_type: MessageType,
        message_id: impl Into<String>,
        action: impl Into<Value>,
        payload: impl Serialize,
    ) -> Result<Self, FrameError> {
        Ok(Self {
            message_type,
            message_id: message_id.into(),
            action: action.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Parse a frame from raw message bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let Value::Array(items) = serde_json::from_slice::<Value>(bytes)? else {
            return Err(FrameError::NotAnArray);
        };

        let [kind, message_id, action, payload]: [Value; 4] = items
            .try_into()
            .map_err(|items: Vec<Value>| FrameError::Arity(items.len()))?;

        let message_type: MessageType = kind
            .as_i64()
            .ok_or(FrameError::InvalidMessageType)?
            .try_into()?;

        let Value::String(message_id) = message_id else {
            return Err(FrameError::InvalidMessageId);
        };
        Ok(Self {
            message_type,
            message_id,
            action,
            payload,
        })
    }

    pub fn is_call(&self) -> bool {
        self.message_type == MessageType::Call
    }

    /// Action as text; non-string actions render as their JSON
    pub fn action_name(&self) -> String {
        match &self.action {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        }
    }

    /// Serialize to wire text in the requested shape
    pub fn to_text(&self, format: ReplyFormat) -> Result<String, FrameError> {
        let kind = self.message_type as i32;

        let array = match (format, self.message_type) {
            (ReplyFormat::Standard, MessageType::CallResult) => {
                serde_json::json!([kind, &self.message_id, &self.payload])
            }
            (ReplyFormat::Standard, MessageType::CallError) => serde_json::json!([
                kind,
                &self.message_id,
                ErrorCode::NotImplemented,
                format!("Unknown action: {}", self.action_name()),
                &self.payload
            ]),
            _ => serde_json::json!([kind, &self.message_id, &self.action, &self.payload]),
        };

        Ok(serde_json::to_string(&array)?)
    }
}
