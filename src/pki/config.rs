//! Provider configuration.

use serde::{Deserialize, Serialize};

use crate::secrets::SecretString;

use super::error::{PkiError, Result};

/// Connection and issuance parameters for a Vault-hosted authority.
///
/// `mount_path` is the PKI engine mount prefix ("pki/", "pki_int/", ...);
/// `role` is the issuing role all leaf certificates go through. The token is
/// redacted in Debug output and serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultPkiParams {
    pub address: String,
    pub token: SecretString,
    pub mount_path: String,
    pub role: String,
}

impl VaultPkiParams {
    /// Load parameters from environment variables.
    ///
    /// - `TRUSTPLANE_VAULT_ADDR`: Vault server address (required)
    /// - `TRUSTPLANE_VAULT_TOKEN`: authentication token (required)
    /// - `TRUSTPLANE_VAULT_PKI_MOUNT_PATH`: PKI mount prefix (default: "pki/")
    /// - `TRUSTPLANE_VAULT_PKI_ROLE`: issuing role (required)
    pub fn from_env() -> Result<Self> {
        let address = std::env::var("TRUSTPLANE_VAULT_ADDR")
            .map_err(|_| PkiError::config("TRUSTPLANE_VAULT_ADDR environment variable not set"))?;
        let token = std::env::var("TRUSTPLANE_VAULT_TOKEN")
            .map_err(|_| PkiError::config("TRUSTPLANE_VAULT_TOKEN environment variable not set"))?;
        let mount_path = std::env::var("TRUSTPLANE_VAULT_PKI_MOUNT_PATH")
            .unwrap_or_else(|_| default_mount_path());
        let role = std::env::var("TRUSTPLANE_VAULT_PKI_ROLE").map_err(|_| {
            PkiError::config("TRUSTPLANE_VAULT_PKI_ROLE environment variable not set")
        })?;

        let params = Self { address, token: token.into(), mount_path, role };
        params.validate()?;
        Ok(params)
    }

    /// Reject configurations that could never issue a certificate.
    /// Role *existence* is probed against the backend at provider
    /// construction, not here.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(PkiError::config("Vault address cannot be empty"));
        }
        if self.mount_path.trim().is_empty() {
            return Err(PkiError::config("PKI mount path cannot be empty"));
        }
        if self.role.trim().is_empty() {
            return Err(PkiError::config("PKI role cannot be empty"));
        }
        Ok(())
    }

    /// Mount path with a guaranteed trailing slash, ready for path joins.
    pub fn normalized_mount(&self) -> String {
        let trimmed = self.mount_path.trim_end_matches('/');
        format!("{}/", trimmed)
    }
}

fn default_mount_path() -> String {
    "pki/".to_string()
}

/// Persisted description of a certificate authority, resolved to a concrete
/// provider once at construction (see
/// [`provider_for_config`](super::provider::provider_for_config)).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum AuthorityConfig {
    /// Locally generated self-signed root.
    SelfSigned,
    /// Authority hosted in a Vault PKI engine.
    HashicorpVault(VaultPkiParams),
}
