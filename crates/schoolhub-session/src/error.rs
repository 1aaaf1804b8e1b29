//! Error types for the session layer.

/// Errors that can occur while reading or writing the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The storage medium itself could not be accessed (permissions,
    /// read-only filesystem, missing data directory). Fatal for the
    /// operation that hit it, not for the session.
    #[error("session storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An authenticated call was attempted with no stored token.
    #[error("not signed in")]
    NotAuthenticated,

    /// Refused to store an empty or whitespace-only token.
    #[error("refusing to store a blank session token")]
    InvalidToken,
}
