//! Unified error types for backplane.
//!
//! Each variant renders as `CODE: detail` so the string form handed back to a
//! window stays greppable.

use tokio_rusqlite::rusqlite;

use crate::types::{Collection, WindowHandle};

/// Unified error type shared by the store, the router and the image cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown action kind for a collection.
    #[error("INVALID_ACTION: invalid {0} db action")]
    InvalidAction(Collection),

    /// Store failure already flattened to its message form.
    #[error("STORE_ERROR: {0}")]
    Store(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Payload or stored document does not have the expected shape.
    #[error("INVALID_DOCUMENT: {0}")]
    InvalidDocument(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Real network fetch for an image failed.
    #[error("UPSTREAM_FETCH_FAILED: {0}")]
    UpstreamFetch(String),

    /// Upstream response too large to cache or forward.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A destroyed window handle was presented again.
    #[error("WINDOW_RETIRED: window {0} was already destroyed")]
    WindowRetired(WindowHandle),

    /// The control thread is gone.
    #[error("HOST_UNAVAILABLE")]
    HostUnavailable,

    /// File write rejected or failed.
    #[error("SAVE_FAILED: {0}")]
    SaveFailed(String),

    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Flatten any failure into the single message form used for store errors.
    pub fn into_store_message(self) -> Self {
        match self {
            Error::InvalidAction(_) | Error::Store(_) => self,
            other => Error::Store(other.to_string()),
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
        Error::InvalidDocument(err.to_string())
    }
}
