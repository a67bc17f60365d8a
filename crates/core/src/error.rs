//! Unified error types for swcache.
//!
//! Every variant carries a stable wire code (the prefix of its display
//! string) that the host harness reports back to its caller.

use tokio_rusqlite::rusqlite;

/// Unified error types for the caching worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., a malformed host command).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A resource identifier could not be resolved to a URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Connectivity, DNS or TLS failure while fetching.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A response arrived but its status made it unusable for precaching.
    #[error("BAD_STATUS: {url} returned {status}")]
    BadStatus { url: String, status: u16 },

    /// Only GET requests can be stored in a cache generation.
    #[error("UNSUPPORTED_METHOD: {0}")]
    UnsupportedMethod(String),

    /// Neither the network nor the cache could produce a response.
    #[error("NO_RESPONSE: {0}")]
    NoResponse(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: {0}")]
    Storage(String),
}

impl Error {
    /// Stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_ERROR",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::BadStatus { .. } => "BAD_STATUS",
            Error::UnsupportedMethod(_) => "UNSUPPORTED_METHOD",
            Error::NoResponse(_) => "NO_RESPONSE",
            Error::Database(_) | Error::MigrationFailed(_) | Error::Storage(_) => "CACHE_ERROR",
        }
    }
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
        Error::Storage(format!("failed to decode stored headers: {err}"))
    }
}
