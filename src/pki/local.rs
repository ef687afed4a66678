//! Self-signed local certificate authority provider.
//!
//! The `SelfSigned` member of the closed provider set: the authority's key
//! never leaves the process, leaves are signed in-memory, and the bundle
//! dump writes both the root certificate and its key so other components
//! can pick them up from disk.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, SanType};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::secrets::SecretString;

use super::codec::{self, Certificate, CertificateFilePaths};
use super::error::{PkiError, Result};
use super::provider::{
    ca_bundle_path, CaBundlePaths, CachedState, CertProviderType, CertificateProvider,
    IssuanceRequest, IssuedCertificateBundle,
};

const DEFAULT_CA_VALIDITY_DAYS: i64 = 3650;
const DEFAULT_LEAF_VALIDITY_DAYS: i64 = 365;
const CA_KEY_FILE_NAME: &str = "ca.key.pem";

/// In-memory root authority material.
struct LocalAuthority {
    cert: rcgen::Certificate,
    key_pair: KeyPair,
    cert_pem: String,
    key_pem: SecretString,
}

/// Certificate provider backed by a locally generated self-signed root.
pub struct LocalCaProvider {
    authority_id: Uuid,
    authority: Mutex<Option<LocalAuthority>>,
    cache: Mutex<CachedState>,
}

impl std::fmt::Debug for LocalCaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generated = self.authority.lock().map(|a| a.is_some()).unwrap_or(false);
        f.debug_struct("LocalCaProvider")
            .field("authority_id", &self.authority_id)
            .field("ca_generated", &generated)
            .finish()
    }
}

impl LocalCaProvider {
    pub fn new(authority_id: Uuid) -> Self {
        Self {
            authority_id,
            authority: Mutex::new(None),
            cache: Mutex::new(CachedState::default()),
        }
    }

    fn authority(&self) -> MutexGuard<'_, Option<LocalAuthority>> {
        self.authority.lock().expect("authority lock poisoned")
    }

    fn cache(&self) -> MutexGuard<'_, CachedState> {
        self.cache.lock().expect("provider cache lock poisoned")
    }

    /// PEM of the most recently issued certificate, if any.
    pub fn last_certificate_pem(&self) -> Option<String> {
        self.cache().cert_pem.clone()
    }

    /// Private key of the most recently issued certificate, still redacted.
    pub fn last_private_key_pem(&self) -> Option<SecretString> {
        self.cache().key_pem.clone()
    }

    /// Sign a leaf against the root and verify the result before anything
    /// is returned or persisted.
    fn issue(&self, request: &IssuanceRequest) -> Result<IssuedCertificateBundle> {
        let guard = self.authority();
        let authority = guard
            .as_ref()
            .ok_or_else(|| PkiError::config("local CA has not been generated yet"))?;

        let leaf_key = KeyPair::generate()
            .map_err(|e| PkiError::internal(format!("leaf key generation failed: {}", e)))?;

        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, request.subject_common_name.as_str());
        params.is_ca = IsCa::NoCa;

        for name in &request.dns_sans {
            let san = name.clone().try_into().map_err(|e| {
                PkiError::config(format!("invalid DNS subject alternative name '{}': {}", name, e))
            })?;
            params.subject_alt_names.push(SanType::DnsName(san));
        }
        for ip in &request.ip_sans {
            params.subject_alt_names.push(SanType::IpAddress(*ip));
        }

        let now = OffsetDateTime::now_utc();
        params.not_before = match request.valid_from {
            Some(from) => to_offset(from)?,
            None => now,
        };
        params.not_after = match request.valid_until {
            Some(until) => to_offset(until)?,
            None => now + time::Duration::days(DEFAULT_LEAF_VALIDITY_DAYS),
        };

        let leaf = params
            .signed_by(&leaf_key, &authority.cert, &authority.key_pair)
            .map_err(|e| PkiError::internal(format!("certificate signing failed: {}", e)))?;

        let cert_pem = leaf.pem();
        let key_pem = leaf_key.serialize_pem();
        let certificate = Certificate::from_pem(&cert_pem)?;
        let private_key = codec::PrivateKeyPem::from_pem(&key_pem)?;
        let issuing_ca = Certificate::from_pem(&authority.cert_pem)?;

        certificate.verify_signed_by(&issuing_ca)?;

        {
            let mut cache = self.cache();
            cache.cert_pem = Some(cert_pem);
            cache.key_pem = Some(SecretString::new(key_pem));
        }

        Ok(IssuedCertificateBundle { certificate, private_key, issuing_ca, serial_number: None })
    }
}

#[async_trait]
impl CertificateProvider for LocalCaProvider {
    fn provider_type(&self) -> CertProviderType {
        CertProviderType::SelfSigned
    }

    fn authority_id(&self) -> Uuid {
        self.authority_id
    }

    async fn generate_ca_certificate(&self, label: &str) -> Result<Certificate> {
        info!(authority = %self.authority_id, label, "Generating self-signed root CA");

        let key_pair = KeyPair::generate()
            .map_err(|e| PkiError::internal(format!("CA key generation failed: {}", e)))?;

        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, label);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages.push(KeyUsagePurpose::KeyCertSign);
        params.key_usages.push(KeyUsagePurpose::CrlSign);

        let now = OffsetDateTime::now_utc();
        params.not_before = now - time::Duration::days(1);
        params.not_after = now + time::Duration::days(DEFAULT_CA_VALIDITY_DAYS);

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| PkiError::internal(format!("CA certificate generation failed: {}", e)))?;

        let cert_pem = cert.pem();
        let certificate = Certificate::from_pem(&cert_pem)?;
        let key_pem = SecretString::new(key_pair.serialize_pem());

        self.cache().ca_cert_pem = Some(cert_pem.clone());
        *self.authority() = Some(LocalAuthority { cert, key_pair, cert_pem, key_pem });

        Ok(certificate)
    }

    async fn create_certificate(
        &self,
        storage_dir: &Path,
        request: &IssuanceRequest,
        cert_file_name: &str,
        key_file_name: &str,
    ) -> Result<CertificateFilePaths> {
        info!(
            subject = %request.subject_common_name,
            authority = %self.authority_id,
            "Issuing certificate from local CA"
        );

        let wrap =
            |e: PkiError| PkiError::issuance(request.subject_common_name.as_str(), self.authority_id, e);

        let bundle = self.issue(request).map_err(wrap)?;
        codec::write_cert_and_key(
            storage_dir,
            cert_file_name,
            key_file_name,
            &bundle.certificate,
            &bundle.private_key,
        )
        .map_err(wrap)
    }

    async fn dump_ca_cert_bundle(
        &self,
        storage_dir: &Path,
        tenant_id: Uuid,
        authority_id: Uuid,
    ) -> Result<CaBundlePaths> {
        let (root, key_pem) = {
            let guard = self.authority();
            let authority = guard.as_ref().ok_or_else(|| {
                PkiError::chain_retrieval(
                    self.provider_type(),
                    PkiError::config("local CA has not been generated yet"),
                )
            })?;
            (Certificate::from_pem(&authority.cert_pem)?, authority.key_pem.clone())
        };

        let bundle_path = ca_bundle_path(storage_dir, tenant_id, authority_id);
        debug!(path = %bundle_path.display(), "Writing local CA bundle");
        codec::write_bundle(std::slice::from_ref(&root), &bundle_path)
            .map_err(|e| PkiError::bundle_write(self.provider_type(), e))?;

        let key_path = bundle_path.with_file_name(CA_KEY_FILE_NAME);
        std::fs::write(&key_path, key_pem.expose_secret())
            .map_err(|e| PkiError::bundle_write(self.provider_type(), PkiError::Io(e)))?;

        Ok(CaBundlePaths { bundle_path, ca_key_path: Some(key_path) })
    }

    async fn ca_certificate_pem(&self) -> Result<String> {
        self.cache()
            .ca_cert_pem
            .clone()
            .ok_or_else(|| PkiError::config("local CA has not been generated yet"))
    }
}

fn to_offset(dt: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| PkiError::internal(format!("validity bound out of range: {}", e)))
}
