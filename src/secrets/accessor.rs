//! Secret-store accessor: authenticated reads and writes against the
//! Vault logical API.
//!
//! The certificate providers never talk HTTP themselves; they depend on the
//! [`SecretStoreAccessor`] contract, which exposes exactly two operations
//! over logical paths. `VaultAccessor` is the production implementation,
//! a thin token-authenticated wrapper over `GET/POST {address}/v1/{path}`.
//!
//! Timeouts, TLS, and cancellation are the HTTP client's business; this
//! layer adds no retry (certificate issuance is not idempotent, so retry
//! policy belongs to callers that know an operation is safe to repeat).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info};

use super::error::{AccessorError, Result};
use super::types::SecretString;

/// Authenticated access to a remote secret store, addressed by logical path.
///
/// `read_field` fetches a single named field from the secret at `path`.
/// `write` submits a field map and returns the field map the store answers
/// with (Vault's PKI `issue` endpoint returns the issued material this way).
#[async_trait]
pub trait SecretStoreAccessor: Send + Sync {
    async fn read_field(&self, path: &str, field: &str) -> Result<String>;

    async fn write(
        &self,
        path: &str,
        data: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>>;
}

/// Vault-backed [`SecretStoreAccessor`] over the logical HTTP API.
pub struct VaultAccessor {
    http: reqwest::Client,
    address: String,
    token: SecretString,
}

impl std::fmt::Debug for VaultAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultAccessor")
            .field("address", &self.address)
            .field("token", &self.token)
            .finish()
    }
}

impl VaultAccessor {
    /// Build an accessor and probe `sys/health` to confirm the store is
    /// reachable before anything depends on it.
    pub async fn connect(address: &str, token: SecretString) -> Result<Self> {
        if address.is_empty() {
            return Err(AccessorError::config("Vault address cannot be empty"));
        }

        let http = reqwest::Client::builder().build().map_err(|e| {
            AccessorError::connection_failed(format!("failed to build HTTP client: {}", e))
        })?;

        let accessor = Self { http, address: address.trim_end_matches('/').to_string(), token };
        accessor.health_check().await?;

        info!(address = %accessor.address, "Connected to Vault");
        Ok(accessor)
    }

    /// Check `sys/health`. Active (200) and standby (429) stores are usable;
    /// sealed or uninitialized ones are not.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1/sys/health", self.address);
        let response = self.http.get(&url).send().await.map_err(|e| {
            AccessorError::connection_failed(format!("Vault health check failed: {}", e))
        })?;

        let status = response.status().as_u16();
        if status == 200 || status == 429 {
            debug!(status, "Vault health check passed");
            Ok(())
        } else {
            error!(status, "Vault health check reported an unusable server");
            Err(AccessorError::connection_failed(format!(
                "Vault health check returned status {}",
                status
            )))
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    async fn request_json(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url_for(path);
        let request = match body {
            Some(payload) => self.http.post(&url).json(payload),
            None => self.http.get(&url),
        };

        let response = request
            .header("X-Vault-Token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| AccessorError::connection_failed(format!("request to '{}' failed: {}", path, e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AccessorError::connection_failed(format!("reading response from '{}' failed: {}", path, e))
        })?;

        if !status.is_success() {
            return Err(AccessorError::http(path, status.as_u16(), vault_error_message(&text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| AccessorError::invalid_response(path, format!("body is not JSON: {}", e)))
    }

    fn data_object(path: &str, body: Value) -> Result<serde_json::Map<String, Value>> {
        let data = match body {
            Value::Object(mut map) => map.remove("data"),
            _ => None,
        };
        match data {
            Some(Value::Object(fields)) => Ok(fields),
            _ => Err(AccessorError::invalid_response(path, "missing 'data' object")),
        }
    }
}

#[async_trait]
impl SecretStoreAccessor for VaultAccessor {
    async fn read_field(&self, path: &str, field: &str) -> Result<String> {
        debug!(path, field, "Reading field from Vault");
        let body = self.request_json(path, None).await?;
        let data = Self::data_object(path, body)?;
        data.get(field)
            .map(field_value_to_string)
            .ok_or_else(|| AccessorError::missing_field(path, field))
    }

    async fn write(
        &self,
        path: &str,
        data: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        debug!(path, fields = data.len(), "Writing to Vault");
        let payload = serde_json::to_value(data)
            .map_err(|e| AccessorError::invalid_response(path, format!("unencodable payload: {}", e)))?;
        let body = self.request_json(path, Some(&payload)).await?;
        let response = Self::data_object(path, body)?;

        Ok(response.iter().map(|(k, v)| (k.clone(), field_value_to_string(v))).collect())
    }
}

/// Render a response field as a string. Non-string values keep their JSON
/// serialization, which is exactly how quoted, escaped-newline certificate
/// chains reach the PKI layer (and why it normalizes them).
fn field_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Vault error bodies look like `{"errors": ["..."]}`; fall back to the raw
/// body when they do not.
fn vault_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("errors").and_then(Value::as_array).map(|errors| {
                errors.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("; ")
            })
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}
