//! # Trustplane
//!
//! Trustplane is a certificate lifecycle library: it issues, retrieves,
//! verifies, and bundles X.509 certificates against interchangeable trust
//! backends: a locally generated self-signed CA or an external
//! secret-management PKI engine (HashiCorp Vault).
//!
//! ## Architecture
//!
//! ```text
//! Caller (orchestration layer)
//!        ↓
//! CertificateProvider trait  ──►  LocalCaProvider (rcgen, in-process)
//!        │                        VaultPkiProvider
//!        │                              ↓
//!        │                        SecretStoreAccessor (Vault logical API)
//!        ↓
//! Codec (PEM ⇄ X.509, trust verification, file persistence)
//! ```
//!
//! Backends are a closed set, resolved once at provider construction from
//! persisted configuration. Issued certificates are always verified against
//! their issuing CA before they are returned or persisted; an unverifiable
//! certificate is discarded, never handed out.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trustplane::pki::{
//!     provider_for_config, AuthorityConfig, CertificateProvider, IssuanceRequest,
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority_id = Uuid::new_v4();
//!     let provider = provider_for_config(authority_id, &AuthorityConfig::SelfSigned).await?;
//!     provider.generate_ca_certificate("cluster-root").await?;
//!
//!     let request = IssuanceRequest::new("node1.example").with_dns_san("node1.example");
//!     let paths = provider
//!         .create_certificate("/tmp/certs".as_ref(), &request, "node.crt", "node.key")
//!         .await?;
//!     println!("issued {}", paths.cert_path.display());
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod observability;
pub mod pki;
pub mod secrets;

// Re-export commonly used types and traits
pub use errors::{Error, Result};
pub use pki::{
    provider_for_config, AuthorityConfig, CertProviderType, CertificateProvider, IssuanceRequest,
    PkiError,
};
pub use secrets::{SecretStoreAccessor, SecretString, VaultAccessor};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
