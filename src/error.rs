//! Error types for verify-gateway.

/// Errors produced while handling gateway requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request body could not be decoded into the expected shape.
    #[error("Invalid request format")]
    BadRequest,

    /// A required request field is absent, null, or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Missing, malformed, or unknown credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid credential without administrator privileges.
    #[error("{0}")]
    Forbidden(String),

    /// The declared model has no routing entry.
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// The backend was unreachable, timed out, or returned an unparseable body.
    #[error("{0}")]
    Upstream(String),

    /// Requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A record with the same identity already exists.
    #[error("{0}")]
    Conflict(String),

    /// Key store failure.
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
