//! PEM codec: certificate and key material as typed values.
//!
//! Certificates are held as validated DER and re-serialized to canonical
//! PEM on demand, so whatever framing a backend used (extra whitespace,
//! odd line endings) never survives past parsing. Private keys are never
//! re-encoded; the original PEM is kept verbatim behind a redacting
//! wrapper, validated once at construction.

use std::fs;
use std::path::{Path, PathBuf};

use rustls::pki_types::{pem::PemObject, PrivateKeyDer};
use x509_parser::prelude::*;

use crate::secrets::SecretString;

use super::error::{PkiError, Result};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// A parsed X.509 certificate.
///
/// Construction validates the DER; accessors re-parse on demand rather than
/// holding a self-referential parsed form.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Parse a single PEM `CERTIFICATE` block.
    pub fn from_pem(text: &str) -> Result<Self> {
        let block = ::pem::parse(text)
            .map_err(|e| PkiError::parse(format!("invalid certificate PEM: {}", e)))?;
        if block.tag() != CERTIFICATE_TAG {
            return Err(PkiError::parse(format!(
                "expected a CERTIFICATE block, found '{}'",
                block.tag()
            )));
        }
        Self::from_der(block.into_contents())
    }

    /// Take ownership of DER bytes, validating they parse as X.509.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        X509Certificate::from_der(&der)
            .map_err(|e| PkiError::parse(format!("invalid X.509 certificate: {}", e)))?;
        Ok(Self { der })
    }

    /// Canonical PEM serialization (LF line endings).
    pub fn to_pem(&self) -> String {
        let block = ::pem::Pem::new(CERTIFICATE_TAG, self.der.clone());
        ::pem::encode_config(&block, ::pem::EncodeConfig::new().set_line_ending(::pem::LineEnding::LF))
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Full subject distinguished name, e.g. `CN=node1`.
    pub fn subject(&self) -> Result<String> {
        let (_, cert) = self.parse()?;
        Ok(cert.subject().to_string())
    }

    /// First common-name attribute of the subject.
    pub fn subject_common_name(&self) -> Result<String> {
        let (_, cert) = self.parse()?;
        let cn = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PkiError::parse("certificate subject has no common name"));
        cn
    }

    /// Verify that this certificate's signature checks out against the
    /// issuer's public key. Failure means the pair must not be trusted.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        let (_, cert) = self.parse()?;
        let (_, issuer_cert) = issuer.parse()?;
        cert.verify_signature(Some(issuer_cert.public_key())).map_err(|e| {
            PkiError::verification(format!(
                "certificate does not verify against the stated issuing CA: {}",
                e
            ))
        })
    }

    fn parse(&self) -> Result<(&[u8], X509Certificate<'_>)> {
        X509Certificate::from_der(&self.der)
            .map_err(|e| PkiError::parse(format!("invalid X.509 certificate: {}", e)))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate").field("der", &format!("[{} bytes]", self.der.len())).finish()
    }
}

/// A private key in PEM form, validated at construction and redacted in
/// Debug output.
#[derive(Clone)]
pub struct PrivateKeyPem {
    pem: SecretString,
}

impl PrivateKeyPem {
    pub fn from_pem(text: &str) -> Result<Self> {
        PrivateKeyDer::from_pem_slice(text.as_bytes())
            .map_err(|e| PkiError::parse(format!("invalid private key PEM: {}", e)))?;
        Ok(Self { pem: SecretString::new(text) })
    }

    /// The original PEM text. Callers must not log the result.
    pub fn expose_pem(&self) -> &str {
        self.pem.expose_secret()
    }
}

impl std::fmt::Debug for PrivateKeyPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKeyPem").field("pem", &self.pem).finish()
    }
}

/// Locations of an issued certificate/key pair on disk.
#[derive(Debug, Clone)]
pub struct CertificateFilePaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Parse a concatenation of PEM certificate blocks into an ordered list.
/// Backend order is preserved; it is part of the chain's meaning.
pub fn parse_certificate_chain(text: &str) -> Result<Vec<Certificate>> {
    let blocks = ::pem::parse_many(text)
        .map_err(|e| PkiError::parse(format!("invalid certificate chain PEM: {}", e)))?;

    blocks
        .into_iter()
        .map(|block| {
            if block.tag() != CERTIFICATE_TAG {
                return Err(PkiError::parse(format!(
                    "certificate chain contains a '{}' block",
                    block.tag()
                )));
            }
            Certificate::from_der(block.into_contents())
        })
        .collect()
}

/// Write certificates to a single PEM bundle file, in the given order.
pub fn write_bundle(certs: &[Certificate], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut bundle = String::new();
    for cert in certs {
        bundle.push_str(&cert.to_pem());
    }
    fs::write(path, bundle)?;
    Ok(())
}

/// Persist an issued certificate and its private key under `dir` with the
/// caller-supplied file names.
pub fn write_cert_and_key(
    dir: &Path,
    cert_file_name: &str,
    key_file_name: &str,
    cert: &Certificate,
    key: &PrivateKeyPem,
) -> Result<CertificateFilePaths> {
    fs::create_dir_all(dir)?;
    let cert_path = dir.join(cert_file_name);
    let key_path = dir.join(key_file_name);
    fs::write(&cert_path, cert.to_pem())?;
    fs::write(&key_path, key.expose_pem())?;
    Ok(CertificateFilePaths { cert_path, key_path })
}
