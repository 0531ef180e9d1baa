//! Unified error types for bundlecache.
//!
//! Network failures of every shape collapse into `NetworkUnreachable`; the
//! policy layer never distinguishes a timeout from a refused connection.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the cache engine and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure or timeout while talking to the network.
    #[error("NETWORK_UNREACHABLE: {0}")]
    NetworkUnreachable(String),

    /// Metadata could not be read or written.
    ///
    /// Absorbed by the metadata store; only surfaces from the raw accessors.
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(String),

    /// Bulk resync refused because the device is offline or the network is
    /// currently distrusted.
    #[error("NO_INTERNET_OR_SLOW_NETWORK: no internet or slow network")]
    NoInternetOrSlowNetwork,

    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Asset manifest is malformed.
    #[error("INVALID_MANIFEST: {0}")]
    InvalidManifest(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
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
        Error::StoreUnavailable(format!("malformed record: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NetworkUnreachable(msg) => (-32006, msg.clone()),
            Error::StoreUnavailable(msg) => (-32002, msg.clone()),
            Error::NoInternetOrSlowNetwork => (-32013, "no internet or slow network".to_string()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::InvalidManifest(msg) => (-32014, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
