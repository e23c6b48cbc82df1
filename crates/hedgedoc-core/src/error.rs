//! Error types for the hedgedoc backend.

use thiserror::Error;

/// Result type alias using the backend's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by repositories, services and handlers.
///
/// The four domain kinds (`Client`, `NotInDb`, `Permission`, `MediaBackend`)
/// are mapped to fixed HTTP statuses at the API boundary. Everything else is
/// reported as an internal error.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotInDb(String),

    /// Entity with the same unique key already exists
    #[error("Already exists: {0}")]
    AlreadyInDb(String),

    /// Request was malformed or semantically invalid
    #[error("Invalid input: {0}")]
    Client(String),

    /// Caller is authenticated but not allowed to perform the operation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Storage collaborator failed to persist or remove bytes
    #[error("Media backend error: {0}")]
    MediaBackend(String),

    /// Missing, unknown or expired credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a `NotInDb` error about a note identifier.
    pub fn note_not_found(id_or_alias: &str) -> Self {
        Error::NotInDb(format!("Note with id or alias '{}' not found", id_or_alias))
    }

    /// Returns true if the underlying database error is a unique violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
