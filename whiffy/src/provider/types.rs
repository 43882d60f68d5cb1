//! Transport error types

use std::fmt;

/// Errors that can occur while fetching a URI from the remote service.
///
/// Every variant is considered transient at the region level and is subject
/// to the configured retry policy.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The HTTP client could not be constructed
    Client(String),
    /// Connection or protocol failure
    Request { url: String, reason: String },
    /// The request did not complete within the configured timeout
    Timeout { url: String, timeout_secs: u64 },
    /// The server answered with a non-success status
    Status { url: String, status: u16 },
    /// The response body could not be read
    Body { url: String, reason: String },
}

impl TransportError {
    /// Returns `true` if retrying the same request could succeed.
    ///
    /// Client construction failures are configuration problems and never
    /// resolve on their own.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Client(_))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Client(msg) => write!(f, "Failed to create HTTP client: {}", msg),
            TransportError::Request { url, reason } => {
                write!(f, "Request to {} failed: {}", url, reason)
            }
            TransportError::Timeout { url, timeout_secs } => {
                write!(f, "Request to {} timed out after {}s", url, timeout_secs)
            }
            TransportError::Status { url, status } => write!(f, "HTTP {} from {}", status, url),
            TransportError::Body { url, reason } => {
                write!(f, "Failed to read response from {}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for TransportError {}
