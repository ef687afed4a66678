//! HashiCorp Vault PKI certificate provider.
//!
//! Implements [`CertificateProvider`] against a Vault PKI secrets engine
//! through the [`SecretStoreAccessor`] contract. Everything Vault-specific
//! lives here: the logical path vocabulary, the `issue` payload and its
//! TTL-in-hours encoding, field extraction from the issue response, the
//! quote/escaped-newline normalization Vault applies to chain reads, and
//! the trust verification of issued material against the issuing CA.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::secrets::{SecretStoreAccessor, SecretString};

use super::codec::{self, Certificate, CertificateFilePaths, PrivateKeyPem};
use super::config::VaultPkiParams;
use super::error::{PkiError, Result};
use super::provider::{
    ca_bundle_path, CaBundlePaths, CachedState, CertProviderType, CertificateProvider,
    IssuanceRequest, IssuedCertificateBundle,
};

const FIELD_CERTIFICATE: &str = "certificate";
const FIELD_PRIVATE_KEY: &str = "private_key";
const FIELD_ISSUING_CA: &str = "issuing_ca";
const FIELD_SERIAL_NUMBER: &str = "serial_number";
const FIELD_ALLOW_IP_SANS: &str = "allow_ip_sans";

/// The closed set of Vault PKI endpoints this provider touches. Anything
/// else is a programming error, which the enum makes unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VaultOperation {
    Issue,
    CaCert,
    CaChain,
    Roles,
}

impl VaultOperation {
    fn segment(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::CaCert => "cert/ca",
            Self::CaChain => "cert/ca_chain",
            Self::Roles => "roles",
        }
    }
}

/// Certificate provider backed by a Vault PKI engine.
///
/// One instance serves one logical CA (one mount + role). The instance
/// memoizes the last-fetched CA PEM and last-issued certificate/key PEM;
/// see the trait docs for the concurrency contract.
pub struct VaultPkiProvider {
    authority_id: Uuid,
    params: VaultPkiParams,
    /// Normalized to end with '/'; all paths are `{mount_path}{segment}`.
    mount_path: String,
    accessor: Arc<dyn SecretStoreAccessor>,
    cache: Mutex<CachedState>,
}

impl std::fmt::Debug for VaultPkiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultPkiProvider")
            .field("authority_id", &self.authority_id)
            .field("mount_path", &self.mount_path)
            .field("role", &self.params.role)
            .field("accessor", &"[SecretStoreAccessor]")
            .finish()
    }
}

impl VaultPkiProvider {
    /// Build a provider and immediately probe the issuing role.
    ///
    /// A role whose `allow_ip_sans` is off only earns a warning; the
    /// backend itself rejects IP SANs authoritatively at issuance time. A
    /// role that cannot be read at all fails construction: nothing issued
    /// through it could ever succeed.
    pub async fn connect(
        authority_id: Uuid,
        params: VaultPkiParams,
        accessor: Arc<dyn SecretStoreAccessor>,
    ) -> Result<Self> {
        params.validate()?;
        let mount_path = params.normalized_mount();

        let provider = Self {
            authority_id,
            params,
            mount_path,
            accessor,
            cache: Mutex::new(CachedState::default()),
        };
        provider.validate_role_param().await?;

        info!(
            authority = %provider.authority_id,
            mount_path = %provider.mount_path,
            role = %provider.params.role,
            "Vault PKI certificate provider initialized"
        );
        Ok(provider)
    }

    async fn validate_role_param(&self) -> Result<()> {
        let path = self.operation_path(VaultOperation::Roles);
        let allow_ip_sans =
            self.accessor.read_field(&path, FIELD_ALLOW_IP_SANS).await.map_err(|e| {
                PkiError::config(format!(
                    "role '{}' could not be read from Vault: {}",
                    self.params.role, e
                ))
            })?;

        if !is_truthy(&allow_ip_sans) {
            warn!(
                role = %self.params.role,
                "IP subject alternative names are not allowed with this role"
            );
        }
        Ok(())
    }

    fn operation_path(&self, op: VaultOperation) -> String {
        match op {
            VaultOperation::Issue | VaultOperation::Roles => {
                format!("{}{}/{}", self.mount_path, op.segment(), self.params.role)
            }
            VaultOperation::CaCert | VaultOperation::CaChain => {
                format!("{}{}", self.mount_path, op.segment())
            }
        }
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

    /// Issue a leaf certificate. Any failure here (transport, missing
    /// field, parse, verification) aborts the whole operation; there is no
    /// partial bundle.
    async fn issue(&self, request: &IssuanceRequest) -> Result<IssuedCertificateBundle> {
        let mut payload = HashMap::new();
        payload.insert("common_name".to_string(), request.subject_common_name.clone());

        if !request.ip_sans.is_empty() {
            let ips =
                request.ip_sans.iter().map(|ip| ip.to_string()).collect::<Vec<_>>().join(",");
            payload.insert("ip_sans".to_string(), ips);
        }
        if !request.dns_sans.is_empty() {
            let names = request.dns_sans.iter().cloned().collect::<Vec<_>>().join(",");
            payload.insert("alt_names".to_string(), names);
        }
        if let Some(ttl_hours) = requested_ttl_hours(request) {
            debug!(ttl_hours, "Requesting explicit certificate TTL");
            payload.insert("ttl".to_string(), format!("{}h", ttl_hours));
        }

        let path = self.operation_path(VaultOperation::Issue);
        let fields = self.accessor.write(&path, &payload).await?;
        let response = IssueResponse::from_fields(fields)?;

        let certificate = Certificate::from_pem(&response.certificate)?;
        let private_key = PrivateKeyPem::from_pem(&response.private_key)?;
        let issuing_ca = Certificate::from_pem(&response.issuing_ca)?;

        // Never hand out material that does not chain to the stated issuer.
        certificate.verify_signed_by(&issuing_ca)?;

        {
            let mut cache = self.cache();
            cache.ca_cert_pem = Some(response.issuing_ca);
            cache.cert_pem = Some(response.certificate);
            cache.key_pem = Some(SecretString::new(response.private_key));
        }

        Ok(IssuedCertificateBundle {
            certificate,
            private_key,
            issuing_ca,
            serial_number: response.serial_number,
        })
    }

    /// Read and parse the CA certificate at `{mount}cert/ca`, caching its PEM.
    async fn fetch_ca_certificate(&self) -> Result<(Certificate, String)> {
        let path = self.operation_path(VaultOperation::CaCert);
        let pem = self.accessor.read_field(&path, FIELD_CERTIFICATE).await?;
        let cert = Certificate::from_pem(&pem)?;
        self.cache().ca_cert_pem = Some(pem.clone());
        Ok((cert, pem))
    }

    /// Read the CA chain at `{mount}cert/ca_chain`. An absent chain is a
    /// valid answer (root-only CA), not an error.
    async fn fetch_ca_chain(&self) -> Result<Vec<Certificate>> {
        let path = self.operation_path(VaultOperation::CaChain);
        let raw = self.accessor.read_field(&path, FIELD_CERTIFICATE).await?;
        let normalized = normalize_chain_pem(&raw);

        if normalized.is_empty() {
            debug!(authority = %self.authority_id, "No certificate chain found for the CA");
            return Ok(Vec::new());
        }
        codec::parse_certificate_chain(&normalized)
    }
}

#[async_trait]
impl CertificateProvider for VaultPkiProvider {
    fn provider_type(&self) -> CertProviderType {
        CertProviderType::HashicorpVault
    }

    fn authority_id(&self) -> Uuid {
        self.authority_id
    }

    async fn generate_ca_certificate(&self, _label: &str) -> Result<Certificate> {
        // The authority lives in Vault; "generation" resolves to a read.
        match self.fetch_ca_certificate().await {
            Ok((cert, _)) => Ok(cert),
            Err(e) => Err(PkiError::chain_retrieval(self.provider_type(), e)),
        }
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
            mount_path = %self.mount_path,
            role = %self.params.role,
            "Issuing certificate via Vault PKI"
        );

        let wrap =
            |e: PkiError| PkiError::issuance(request.subject_common_name.as_str(), self.authority_id, e);

        let bundle = self.issue(request).await.map_err(wrap)?;
        let paths = codec::write_cert_and_key(
            storage_dir,
            cert_file_name,
            key_file_name,
            &bundle.certificate,
            &bundle.private_key,
        )
        .map_err(wrap)?;

        info!(
            subject = %request.subject_common_name,
            serial_number = ?bundle.serial_number,
            cert_path = %paths.cert_path.display(),
            "Issued certificate verified and persisted"
        );
        Ok(paths)
    }

    async fn dump_ca_cert_bundle(
        &self,
        storage_dir: &Path,
        tenant_id: Uuid,
        authority_id: Uuid,
    ) -> Result<CaBundlePaths> {
        info!(tenant = %tenant_id, authority = %authority_id, "Dumping CA certificate bundle");

        // CA first, then the chain exactly as the backend returned it. No
        // dedup: a chain that repeats the CA is written as-is.
        let mut certs = Vec::new();
        let (ca, _) = self
            .fetch_ca_certificate()
            .await
            .map_err(|e| PkiError::chain_retrieval(self.provider_type(), e))?;
        certs.push(ca);
        certs.extend(
            self.fetch_ca_chain()
                .await
                .map_err(|e| PkiError::chain_retrieval(self.provider_type(), e))?,
        );
        debug!(total = certs.len(), "Total certificates in bundle");

        let bundle_path = ca_bundle_path(storage_dir, tenant_id, authority_id);
        info!(path = %bundle_path.display(), "Writing CA bundle");
        codec::write_bundle(&certs, &bundle_path)
            .map_err(|e| PkiError::bundle_write(self.provider_type(), e))?;

        Ok(CaBundlePaths { bundle_path, ca_key_path: None })
    }

    async fn ca_certificate_pem(&self) -> Result<String> {
        if let Some(pem) = self.cache().ca_cert_pem.clone() {
            return Ok(pem);
        }
        match self.fetch_ca_certificate().await {
            Ok((_, pem)) => Ok(pem),
            Err(e) => Err(PkiError::chain_retrieval(self.provider_type(), e)),
        }
    }
}

/// Issue-response fields, extracted and checked before any cryptographic
/// parsing happens. Unknown fields are ignored so newer engine versions
/// keep working.
#[derive(Debug)]
struct IssueResponse {
    certificate: String,
    private_key: String,
    issuing_ca: String,
    serial_number: Option<String>,
}

impl IssueResponse {
    fn from_fields(mut fields: HashMap<String, String>) -> Result<Self> {
        fn required(fields: &mut HashMap<String, String>, name: &str) -> Result<String> {
            fields
                .remove(name)
                .ok_or_else(|| PkiError::parse(format!("issue response missing field '{}'", name)))
        }

        Ok(Self {
            certificate: required(&mut fields, FIELD_CERTIFICATE)?,
            private_key: required(&mut fields, FIELD_PRIVATE_KEY)?,
            issuing_ca: required(&mut fields, FIELD_ISSUING_CA)?,
            serial_number: fields.remove(FIELD_SERIAL_NUMBER),
        })
    }
}

/// Whole hours between the validity bounds, or `None` when the bounds are
/// absent or span less than an hour. A sub-hour window deliberately falls
/// back to the backend's default TTL instead of failing or rounding up.
fn requested_ttl_hours(request: &IssuanceRequest) -> Option<u64> {
    let (from, until) = match (request.valid_from, request.valid_until) {
        (Some(from), Some(until)) => (from, until),
        _ => return None,
    };

    let hours = (until - from).num_hours().unsigned_abs();
    if hours == 0 {
        None
    } else {
        Some(hours)
    }
}

/// Undo the JSON-ish framing Vault applies to chain reads: a surrounding
/// run of quotes, then literal `\n` escapes. Quote stripping must happen
/// first, and the whole thing is idempotent.
fn normalize_chain_pem(raw: &str) -> String {
    raw.trim_matches('"').replace("\\n", "\n")
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}
