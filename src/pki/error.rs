//! Error taxonomy for certificate operations.

use thiserror::Error;
use uuid::Uuid;

use crate::secrets::AccessorError;

use super::provider::CertProviderType;

/// Result type for certificate-provider operations.
pub type Result<T> = std::result::Result<T, PkiError>;

/// Errors raised by certificate providers.
///
/// `Issuance`, `ChainRetrieval`, and `BundleWrite` wrap an underlying cause
/// with the context a caller needs to act on it (subject, authority,
/// backend); the remaining variants are the causes themselves. Nothing in
/// this crate recovers from these automatically; issuance in particular is
/// not idempotent, so a failed call must surface, never be retried here.
#[derive(Error, Debug)]
pub enum PkiError {
    /// Provider configuration is malformed or incomplete.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The secret-store accessor could not complete a read or write.
    #[error("Secret store transport error: {0}")]
    Transport(#[from] AccessorError),

    /// A response field was missing or did not hold valid PEM/X.509 data.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// An issued certificate failed to verify against its stated issuing CA.
    /// Always fatal; the material is discarded.
    #[error("Certificate verification failed: {reason}")]
    Verification { reason: String },

    /// Umbrella for any failure while creating a certificate.
    #[error("Failed to issue certificate for '{subject}' using CA {authority}: {source}")]
    Issuance {
        subject: String,
        authority: Uuid,
        #[source]
        source: Box<PkiError>,
    },

    /// CA or CA-chain material could not be retrieved from the backend.
    #[error("{backend}: failed to extract CA certificate: {source}")]
    ChainRetrieval {
        backend: CertProviderType,
        #[source]
        source: Box<PkiError>,
    },

    /// Retrieval succeeded but the bundle could not be written locally.
    #[error("{backend}: failed to dump CA certificate bundle: {source}")]
    BundleWrite {
        backend: CertProviderType,
        #[source]
        source: Box<PkiError>,
    },

    /// Filesystem failure while persisting certificate material.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (key generation, signing).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PkiError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse { reason: reason.into() }
    }

    pub fn verification(reason: impl Into<String>) -> Self {
        Self::Verification { reason: reason.into() }
    }

    pub fn issuance(subject: impl Into<String>, authority: Uuid, source: PkiError) -> Self {
        Self::Issuance { subject: subject.into(), authority, source: Box::new(source) }
    }

    pub fn chain_retrieval(backend: CertProviderType, source: PkiError) -> Self {
        Self::ChainRetrieval { backend, source: Box::new(source) }
    }

    pub fn bundle_write(backend: CertProviderType, source: PkiError) -> Self {
        Self::BundleWrite { backend, source: Box::new(source) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}
