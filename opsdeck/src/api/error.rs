//! Error types for backend API calls.

use thiserror::Error;

/// Errors that can occur while talking to the backend API.
///
/// Every variant is recoverable from the sync layer's point of view: a
/// failed call only skips one poll cycle.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request itself failed (connection, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered with a non-success status code.
    #[error("Backend returned HTTP {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    /// The response body could not be decoded into the expected shape.
    #[error("Failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}
