//! Unified error types for intercache.
//!
//! One enum covers the whole pipeline: URL handling, network transport,
//! cache store backends, and HTTP status policy. Cross-origin bypass is
//! deliberately not represented here; it is a routing outcome, not an error.

use tokio_rusqlite::rusqlite;

/// Unified error type for intercache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or has an unsupported scheme.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The fetch could not complete (DNS, connect, timeout, body read).
    ///
    /// A completed response with a non-200 status is *not* a network
    /// failure; see [`Error::HttpStatus`].
    #[error("network failure: {0}")]
    Network(String),

    /// The fetch completed but the status made the operation fail
    /// (e.g. a critical asset answering non-200 during install).
    #[error("unexpected status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A store backend operation failed.
    #[error("store operation failed: {0}")]
    Store(String),

    /// Database operation failed.
    #[error("database operation failed: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be serialized or deserialized.
    #[error("entry serialization failed: {0}")]
    Serialization(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_display() {
        let err = Error::Network("connection refused".to_string());
        assert!(err.to_string().contains("network failure"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_http_status_display() {
        let err = Error::HttpStatus { url: "https://example.com/".to_string(), status: 404 };
        assert!(err.to_string().contains("404"));
    }
}
