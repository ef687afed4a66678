//! Crate-level error handling.
//!
//! Domain-specific failures have their own enums
//! ([`PkiError`](crate::pki::PkiError),
//! [`AccessorError`](crate::secrets::AccessorError)); this type covers the
//! application-level rest, such as observability setup.

/// Crate-level result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}
