//! WebSocket handshake admission
//!
//! Decides whether a charge point may open a session: the first path segment
//! must name the charge point, and the subprotocol is selected only when the
//! client offers it.

use std::fmt;

use thiserror::Error;
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderValue, StatusCode},
};
use tracing::{debug, warn};

use crate::config::ServerConfig;

/// Identity a charge point announces in its connection path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reasons a handshake is refused
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Invalid clientid")]
    MissingClientId,

    #[error("Invalid clientid")]
    UndefinedClientId,

    #[error("subprotocol {expected} not offered (offered: {offered:?})")]
    UnsupportedSubprotocol {
        expected: String,
        offered: Vec<String>,
    },
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MissingClientId | GateError::UndefinedClientId => StatusCode::NOT_FOUND,
            GateError::UnsupportedSubprotocol { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// HTTP response sent instead of the upgrade
    pub fn to_response(&self) -> ErrorResponse {
        let mut response = ErrorResponse::new(Some(self.to_string()));
        *response.status_mut() = self.status();
        response
    }
}

/// Handshake policy shared by every accepted socket
#[derive(Debug, Clone)]
pub struct ConnectionGate {
    subprotocol: String,
    strict: bool,
}

impl ConnectionGate {
    pub fn new(subprotocol: impl Into<String>, strict: bool) -> Self {
        Self {
            subprotocol: subprotocol.into(),
            strict,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.subprotocol.clone(), config.strict_subprotocol)
    }

    /// Extract the charge point identity from the request path.
    ///
    /// `/CP042` and `/CP042/anything` both yield `CP042`.
    pub fn client_id(path: &str) -> Result<ClientId, GateError> {
        match path.split('/').nth(1) {
            None | Some("") => Err(GateError::MissingClientId),
            Some("undefined") => Err(GateError::UndefinedClientId),
            Some(id) => Ok(ClientId(id.to_string())),
        }
    }

    /// Pick the subprotocol to echo back; empty when not offered
    pub fn select_subprotocol<'a, I>(&self, offered: I) -> &str
    where
        I: IntoIterator<Item = &'a str>,
    {
        if offered.into_iter().any(|p| p == self.subprotocol) {
            &self.subprotocol
        } else {
            ""
        }
    }

    /// All protocols listed across `Sec-WebSocket-Protocol` headers
    pub fn offered_subprotocols(request: &Request) -> Vec<String> {
        request
            .headers()
            .get_all(SEC_WEBSOCKET_PROTOCOL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Run the full admission check against a handshake request
    pub fn admit(
        &self,
        request: &Request,
        mut response: Response,
    ) -> Result<(ClientId, Response), GateError> {
        let client_id = Self::client_id(request.uri().path())?;

        let offered = Self::offered_subprotocols(request);
        let selected = self.select_subprotocol(offered.iter().map(String::as_str));

        if selected.is_empty() {
            if self.strict {
                return Err(GateError::UnsupportedSubprotocol {
                    expected: self.subprotocol.clone(),
                    offered,
                });
            }
            // No header: clients that insisted on a subprotocol fail their side
            warn!(
                "Client {} did not offer {} (offered: {:?})",
                client_id, self.subprotocol, offered
            );
        } else if let Ok(value) = HeaderValue::from_str(selected) {
            response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        debug!("Admitted client {} with subprotocol {:?}", client_id, selected);
        Ok((client_id, response))
    }
}

impl Default for ConnectionGate {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
