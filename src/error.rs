// Error types for API calls and notification parsing.
//
// Transport failures propagate to whoever called the action method.
// Parsing failures are per-notification and never leave the batch loop.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, DramaError>;

/// Errors raised by the client and the notification classifier.
#[derive(Debug, Error)]
pub enum DramaError {
    /// Non-success status that the caller did not allow-list.
    #[error("{method} {url} ({status}) {body}")]
    RequestFailed {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// HTTP 429 from the server. Retried by the transport.
    #[error("{method} {url} rate limited (429)")]
    RateLimited { method: &'static str, url: String },

    /// The retry ceiling was reached while still being rate limited.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<DramaError>,
    },

    /// Connection, TLS or body-read failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response decoded but lacked something we rely on.
    #[error("unexpected response from {url}: {detail}")]
    UnexpectedResponse { url: String, detail: String },

    /// A raw notification could not be read at all.
    #[error("unreadable notification: {0}")]
    InvalidNotification(#[from] serde_json::Error),

    /// The notification was recognized but an expected field or element was missing.
    #[error("malformed notification {id}: missing or invalid {field}")]
    MalformedNotification { id: u64, field: String },
}

impl DramaError {
    pub(crate) fn malformed(id: u64, field: impl Into<String>) -> Self {
        Self::MalformedNotification {
            id,
            field: field.into(),
        }
    }

    /// Whether this error is a 429 that backoff should retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
