//! Certificate lifecycle management.
//!
//! This module is the core of the crate: issuing, retrieving, verifying,
//! and bundling X.509 certificates against interchangeable trust backends.
//!
//! # Architecture
//!
//! - [`CertificateProvider`] is the polymorphic contract every backend
//!   implements; the set of backends is closed ([`CertProviderType`]).
//! - [`VaultPkiProvider`] drives a HashiCorp Vault PKI engine through the
//!   [`SecretStoreAccessor`](crate::secrets::SecretStoreAccessor) contract.
//! - [`LocalCaProvider`] keeps a self-signed root in memory and signs
//!   leaves locally.
//! - [`codec`] converts between PEM text and typed certificate/key values
//!   and persists them.
//!
//! Backend dispatch happens once, at construction, via
//! [`provider_for_config`]; from then on callers hold a
//! `dyn CertificateProvider` and behavior is identical regardless of which
//! backend issued the certificate.
//!
//! # Example
//!
//! ```rust,ignore
//! use trustplane::pki::{provider_for_config, AuthorityConfig, IssuanceRequest};
//!
//! let provider = provider_for_config(authority_id, &config).await?;
//! let paths = provider
//!     .create_certificate(storage_dir, &IssuanceRequest::new("node1"), "node.crt", "node.key")
//!     .await?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod local;
pub mod provider;
pub mod vault;

pub use codec::{Certificate, CertificateFilePaths, PrivateKeyPem};
pub use config::{AuthorityConfig, VaultPkiParams};
pub use error::{PkiError, Result};
pub use local::LocalCaProvider;
pub use provider::{
    ca_bundle_path, provider_for_config, CaBundlePaths, CertProviderType, CertificateProvider,
    IssuanceRequest, IssuedCertificateBundle,
};
pub use vault::VaultPkiProvider;
