//! Unified error types for pdfsnap.

use tokio_rusqlite::rusqlite;

/// Unified error types for the pdfsnap service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request input (e.g., missing `url`).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed, has no host, or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Host is not covered by the domain whitelist. Holds the requested URL.
    #[error("NOT_WHITELISTED: {0}")]
    NotWhitelisted(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Object store backend failure other than a missing key.
    #[error("STORE_ERROR: {0}")]
    Store(String),

    /// Render failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Render did not finish within the configured timeout.
    #[error("RENDER_TIMEOUT: {0}ms")]
    RenderTimeout(u64),
}

impl Error {
    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) | Error::NotWhitelisted(_) => 400,
            Error::Database(_) | Error::MigrationFailed(_) | Error::Store(_) => 500,
            Error::RenderFailed(_) => 502,
            Error::RenderTimeout(_) => 504,
        }
    }

    /// Human-readable message without the error code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidInput(msg) | Error::InvalidUrl(msg) => msg.clone(),
            Error::NotWhitelisted(url) => format!("The URL {url} is not a whitelisted URL"),
            Error::Database(e) => e.to_string(),
            Error::MigrationFailed(msg) | Error::Store(msg) | Error::RenderFailed(msg) => msg.clone(),
            Error::RenderTimeout(ms) => format!("rendering did not finish within {ms}ms"),
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
