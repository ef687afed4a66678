//! Certificate provider abstraction.
//!
//! A provider instance is bound to one certificate authority and issues,
//! retrieves, and bundles certificates against it. The set of backends is
//! closed: [`CertProviderType`] enumerates them, and
//! [`provider_for_config`] resolves persisted configuration into a concrete
//! provider exactly once, at construction.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::secrets::{SecretString, VaultAccessor};

use super::codec::{Certificate, CertificateFilePaths, PrivateKeyPem};
use super::config::AuthorityConfig;
use super::error::{PkiError, Result};
use super::local::LocalCaProvider;
use super::vault::VaultPkiProvider;

/// The closed set of trust backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertProviderType {
    /// Locally generated self-signed CA.
    SelfSigned,
    /// HashiCorp Vault PKI secrets engine.
    HashicorpVault,
}

impl CertProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfSigned => "self_signed",
            Self::HashicorpVault => "hashicorp_vault",
        }
    }
}

impl std::fmt::Display for CertProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to put in a leaf certificate.
///
/// SANs are kept as ordered sets: duplicates carry no meaning and a stable
/// order keeps issued payloads deterministic.
#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    pub subject_common_name: String,
    pub ip_sans: BTreeSet<IpAddr>,
    pub dns_sans: BTreeSet<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl IssuanceRequest {
    pub fn new(subject_common_name: impl Into<String>) -> Self {
        Self {
            subject_common_name: subject_common_name.into(),
            ip_sans: BTreeSet::new(),
            dns_sans: BTreeSet::new(),
            valid_from: None,
            valid_until: None,
        }
    }

    pub fn with_ip_san(mut self, ip: IpAddr) -> Self {
        self.ip_sans.insert(ip);
        self
    }

    pub fn with_dns_san(mut self, name: impl Into<String>) -> Self {
        self.dns_sans.insert(name.into());
        self
    }

    pub fn with_validity(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.valid_from = Some(from);
        self.valid_until = Some(until);
        self
    }
}

/// Everything a backend hands back for one issued certificate.
///
/// Owned by the caller once returned; providers keep only PEM-string copies
/// in their cache, never the parsed objects.
pub struct IssuedCertificateBundle {
    pub certificate: Certificate,
    pub private_key: PrivateKeyPem,
    pub issuing_ca: Certificate,
    pub serial_number: Option<String>,
}

impl std::fmt::Debug for IssuedCertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificateBundle")
            .field("certificate", &self.certificate)
            .field("private_key", &self.private_key)
            .field("issuing_ca", &self.issuing_ca)
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

/// Result of dumping a CA bundle: the bundle file, plus the CA key file for
/// backends that own their key locally.
#[derive(Debug, Clone)]
pub struct CaBundlePaths {
    pub bundle_path: PathBuf,
    pub ca_key_path: Option<PathBuf>,
}

/// Per-instance memoized PEM strings.
///
/// Populated lazily, never invalidated: a provider instance serves a single
/// logical CA for its whole life.
#[derive(Debug, Default)]
pub(crate) struct CachedState {
    pub ca_cert_pem: Option<String>,
    pub cert_pem: Option<String>,
    pub key_pem: Option<SecretString>,
}

/// One trust backend, bound to a certificate authority.
///
/// # Concurrency
///
/// Providers make no ordering promises across concurrent calls on a shared
/// instance: the internal cache is a plain last-write-wins value. Callers
/// that issue concurrently must use separate instances or serialize access
/// themselves. Nothing here retries; every operation maps to at most one
/// backend round trip per remote read or write.
#[async_trait]
pub trait CertificateProvider: Send + Sync + std::fmt::Debug {
    /// Which backend this is, for dispatch and error annotation.
    fn provider_type(&self) -> CertProviderType;

    /// The certificate authority this instance is bound to.
    fn authority_id(&self) -> Uuid;

    /// Produce the authority certificate. Local backends generate one under
    /// the given label; externally hosted authorities resolve this to a
    /// retrieval of the existing CA.
    async fn generate_ca_certificate(&self, label: &str) -> Result<Certificate>;

    /// Issue a leaf certificate and persist it under `storage_dir` with the
    /// given file names. No partial result: any failure surfaces as
    /// [`PkiError::Issuance`] and nothing is returned.
    async fn create_certificate(
        &self,
        storage_dir: &Path,
        request: &IssuanceRequest,
        cert_file_name: &str,
        key_file_name: &str,
    ) -> Result<CertificateFilePaths>;

    /// Write the authority certificate plus its full chain, CA first, to a
    /// single bundle file at the deterministic per-tenant path.
    async fn dump_ca_cert_bundle(
        &self,
        storage_dir: &Path,
        tenant_id: Uuid,
        authority_id: Uuid,
    ) -> Result<CaBundlePaths>;

    /// The authority certificate as PEM, from cache, fetching on first use.
    async fn ca_certificate_pem(&self) -> Result<String>;
}

/// Deterministic bundle location for a (tenant, authority) pair.
pub fn ca_bundle_path(storage_dir: &Path, tenant_id: Uuid, authority_id: Uuid) -> PathBuf {
    storage_dir
        .join("certs")
        .join(tenant_id.to_string())
        .join(authority_id.to_string())
        .join("ca.root.crt")
}

/// Resolve persisted authority configuration into a provider.
///
/// This is the only place backend dispatch happens; afterwards callers hold
/// a `dyn CertificateProvider` and never branch on the backend again.
pub async fn provider_for_config(
    authority_id: Uuid,
    config: &AuthorityConfig,
) -> Result<Box<dyn CertificateProvider>> {
    match config {
        AuthorityConfig::SelfSigned => Ok(Box::new(LocalCaProvider::new(authority_id))),
        AuthorityConfig::HashicorpVault(params) => {
            let accessor = VaultAccessor::connect(&params.address, params.token.clone())
                .await
                .map_err(PkiError::from)?;
            let provider =
                VaultPkiProvider::connect(authority_id, params.clone(), Arc::new(accessor)).await?;
            Ok(Box::new(provider))
        }
    }
}
