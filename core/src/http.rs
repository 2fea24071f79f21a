//! HTTP transport boundary.
//!
//! # Design
//! Requests and responses are described as plain data. The library builds
//! `HttpRequest` values and interprets `HttpResponse` values; the actual
//! network round-trip goes through the [`Transport`] trait, which only knows
//! how to send one request and return status + headers + body, or a
//! connection failure. TLS, pooling and proxies are the transport's problem,
//! not the client's.
//!
//! All fields use owned types (`String`, `Vec`) so request and response
//! values can be captured and replayed freely in tests.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Looks up a response header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The transport failed before any response was obtained.
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Executes one HTTP round-trip.
///
/// Implementations must return non-2xx responses as `Ok` data — status
/// interpretation belongs to the client, not the transport. `Err` is
/// reserved for failures where no response was obtained at all.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default [`Transport`] backed by a ureq agent.
///
/// Configured with status-as-error disabled so 4xx/5xx responses come back
/// as data rather than `Err`, letting the client handle status
/// interpretation.
#[derive(Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match (&request.method, &request.body) {
            (HttpMethod::Get, _) => {
                let mut req = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.call()
            }
            (HttpMethod::Delete, _) => {
                let mut req = self.agent.delete(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.call()
            }
            (HttpMethod::Post, Some(body)) => {
                let mut req = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                let mut req = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.send_empty()
            }
        };

        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
