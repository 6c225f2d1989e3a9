//! Error types for the document store wrapper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or incomplete configuration, raised at construction time.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The database could not be reached while connecting.
    ///
    /// Callers should treat this as unrecoverable for the process.
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Not connected: call connect() first")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Duplicate key in {collection}: {detail}")]
    DuplicateKey { collection: String, detail: String },

    #[error("Driver error: {0}")]
    Driver(String),
}

impl StoreError {
    /// Whether this error came from a failed connection attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
