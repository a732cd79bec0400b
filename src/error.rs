//! Error taxonomy for the announce-handling engine.
//!
//! The core classifies failures by kind rather than by call site, so transport
//! adapters can match on the kind instead of downcasting an opaque error.

use thiserror::Error;

/// Errors `HandleAnnounce` and its collaborators can return.
#[derive(Debug, Error)]
pub enum AnnounceError {
    /// A required record (client, user, torrent) was not found, or the
    /// connection pool could not hand out a connection.
    #[error("not found: {0}")]
    NotFound(String),

    /// Distinguished `NotFound`: the torrent itself does not exist.
    /// Callers in open mode should treat this as "create it"; private mode
    /// surfaces it verbatim.
    #[error("torrent does not exist")]
    TorrentDoesNotExist,

    /// The client sent an illogical event sequence (e.g. "stopped" from a
    /// peer absent from both pools).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other failure of a `Connection` or accounting operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Opaque failure surfaced by a `Connection`, `Pool`, or `Backend`
/// implementation. The core never inspects its contents, only propagates it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl AnnounceError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(StorageError::new(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

pub type AnnounceResult<T> = Result<T, AnnounceError>;
