//! Error types
//!
//! Typed errors for the transport layer and for local validation. Callers in
//! the synchronization core turn these into user-visible messages; nothing
//! here is meant to reach the user verbatim except through `Display`.

use thiserror::Error;

/// Errors that can occur while talking to the backend
#[derive(Error, Debug)]
pub enum TransportError {
    /// Configured base address could not be parsed
    #[error("Invalid address '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request never produced a response (connection refused, timeout, ...)
    #[error("Request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Update did not match any stored name
    #[error("{endpoint}: name not found")]
    NotFound { endpoint: String },

    /// Response body was not what the contract promises
    #[error("Failed to decode response from {endpoint}: {details}")]
    Decode { endpoint: String, details: String },

    /// Live update socket failed
    #[error("Live update socket error: {0}")]
    Socket(String),

    /// Operation is not available on this transport (or was made to fail)
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Whether the backend reported that the old name no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. }
            | TransportError::Socket(_)
            | TransportError::Unavailable(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Local validation failures; these never reach the transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must contain at least {min} characters")]
    TooShort { min: usize },
}
