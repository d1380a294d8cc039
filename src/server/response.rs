//! Locally generated responses.
//!
//! Handlers return an [`EndpointResponse`] instead of writing to the
//! session directly, which keeps them testable without a live connection.

use bytes::Bytes;

use crate::constants::RETRY_AFTER_SECS;
use crate::error::PipelineError;

/// Message returned for unknown routes
pub const NOT_FOUND_MESSAGE: &str = "Method not found.";

/// Response produced by a handler
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Extra headers
    pub headers: Vec<(&'static str, String)>,
    /// Response body
    pub body: Bytes,
}

impl EndpointResponse {
    /// Create a JSON response with the given status and body.
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body: Bytes::from(body),
        }
    }

    /// Create a plain text response (for Prometheus metrics).
    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; version=0.0.4",
            headers: Vec::new(),
            body: Bytes::from(body),
        }
    }

    /// Image bytes with the content type of the requested file
    pub fn file(content_type: &'static str, body: Bytes) -> Self {
        Self {
            status: 200,
            content_type,
            headers: Vec::new(),
            body,
        }
    }

    /// Structured error payload: `{"error": <message>, "status": <code>}`
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({
            "error": message,
            "status": status,
        })
        .to_string();
        Self::json(status, body)
    }

    pub fn not_found() -> Self {
        Self::error(404, NOT_FOUND_MESSAGE)
    }

    /// Admission limit reached
    pub fn overloaded() -> Self {
        let mut response = Self::error(
            503,
            &format!(
                "Server has reached its concurrent request limit. Please retry after {} seconds.",
                RETRY_AFTER_SECS
            ),
        );
        response
            .headers
            .push(("Retry-After", RETRY_AFTER_SECS.to_string()));
        response
    }

    pub fn from_pipeline_error(err: &PipelineError) -> Self {
        Self::error(err.to_http_status(), &err.public_message())
    }
}
