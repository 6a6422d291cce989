//! Error types for remote store operations.

/// Errors returned by the remote service and the adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connectivity probe or transport-level failure.
    #[error("connectivity error: {0}")]
    Connectivity(String),
    /// HTTP transport error.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The remote store rejected the request.
    #[error("remote store rejected the request (status={status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, when one was readable.
        message: String,
    },
}
