//! Error taxonomy for API requests.
//!
//! # Design
//! Every failure a request can produce is one variant of [`ClientError`],
//! so callers branch on kind with an exhaustive match instead of parsing
//! message strings. [`classify`] is the single place a non-2xx response is
//! mapped to a variant; no other module synthesizes error kinds from status
//! codes.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::fields::DecodeError;
use crate::http::{HttpResponse, TransportError};

/// Wait applied when a rate-limited response carries no parsable
/// `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed before any response was obtained.
    #[error("unable to connect to host: {0}")]
    Connection(String),

    /// The server rejected the credential (401/403).
    #[error("authentication with provided token failed")]
    Authentication,

    /// The server rejected the request payload (400) with per-field
    /// messages.
    #[error("request validation failed: {0}")]
    Validation(ValidationErrors),

    /// The requested object does not exist (404).
    #[error("no such object exists")]
    NotFound,

    /// Request rate exceeded (429). Wait `retry_after_secs` before making
    /// further requests.
    #[error("request rate limit exceeded, wait {retry_after_secs} seconds before retrying")]
    RateLimit { retry_after_secs: u64 },

    /// Any other non-2xx status, or a success body that could not be
    /// interpreted.
    #[error("unexpected response: HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    /// A response item failed schema materialization.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::Connection(e.0)
    }
}

/// Field-attributed validation messages from a 400 response, in body order
/// per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    /// The messages for one field, if the server reported any.
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.errors
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, msgs)| msgs.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(field, _)| field.as_str())
    }

    /// All messages across all fields.
    pub fn messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .flat_map(|(_, msgs)| msgs.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join(". "))
    }
}

/// Maps a non-2xx response to its [`ClientError`] kind.
pub fn classify(response: &HttpResponse) -> ClientError {
    match response.status {
        400 => match parse_validation_body(&response.body) {
            Some(errors) => ClientError::Validation(errors),
            None => ClientError::Protocol {
                status: 400,
                body: response.body.clone(),
            },
        },
        401 | 403 => ClientError::Authentication,
        404 => ClientError::NotFound,
        429 => ClientError::RateLimit {
            retry_after_secs: response
                .header("Retry-After")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        status => ClientError::Protocol {
            status,
            body: response.body.clone(),
        },
    }
}

/// Parses a 400 body of the form `{"field": ["msg", ...], ...}`. Values that
/// are single strings (e.g. `{"detail": "msg"}`) are accepted as one-message
/// lists. Anything else is not a validation body.
fn parse_validation_body(body: &str) -> Option<ValidationErrors> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let map = parsed.as_object()?;

    let mut errors = Vec::with_capacity(map.len());
    for (field, value) in map {
        let messages = match value {
            Value::String(msg) => vec![msg.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?,
            _ => return None,
        };
        errors.push((field.clone(), messages));
    }
    Some(ValidationErrors { errors })
}
