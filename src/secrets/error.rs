//! Error types for secret-store access.

use thiserror::Error;

/// Result type for accessor operations.
pub type Result<T> = std::result::Result<T, AccessorError>;

/// Errors raised by a [`SecretStoreAccessor`](super::SecretStoreAccessor).
///
/// Everything here is a transport-level or response-shape failure; this
/// layer performs no retries and no interpretation of certificate material.
#[derive(Error, Debug)]
pub enum AccessorError {
    /// Accessor configuration is unusable (empty address, bad URL).
    #[error("Accessor configuration error: {message}")]
    Config { message: String },

    /// The secret store could not be reached.
    #[error("Secret store connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The secret store answered with a non-success status.
    #[error("Secret store request to '{path}' failed with status {status}: {message}")]
    Http { path: String, status: u16, message: String },

    /// The response was well-formed but the requested field was absent.
    #[error("Field '{field}' missing in response from '{path}'")]
    MissingField { path: String, field: String },

    /// The response body did not have the expected shape.
    #[error("Invalid response from '{path}': {reason}")]
    InvalidResponse { path: String, reason: String },
}

impl AccessorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    pub fn http(path: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Http { path: path.into(), status, message: message.into() }
    }

    pub fn missing_field(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField { path: path.into(), field: field.into() }
    }

    pub fn invalid_response(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse { path: path.into(), reason: reason.into() }
    }
}
