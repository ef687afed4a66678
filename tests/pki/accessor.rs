use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trustplane::secrets::{AccessorError, SecretStoreAccessor, VaultAccessor};

async fn healthy_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "initialized": true, "sealed": false, "standby": false
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn connect_probes_health() -> anyhow::Result<()> {
    let server = healthy_server().await;
    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    accessor.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn connect_rejects_sealed_vault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"sealed": true})))
        .mount(&server)
        .await;

    let err = VaultAccessor::connect(&server.uri(), "test-token".into()).await.unwrap_err();
    assert!(matches!(err, AccessorError::ConnectionFailed { .. }));
}

#[tokio::test]
async fn read_field_extracts_string_values() -> anyhow::Result<()> {
    let server = healthy_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/cert/ca"))
        .and(header("X-Vault-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "certificate": "-----BEGIN CERTIFICATE-----" }
        })))
        .mount(&server)
        .await;

    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    let value = accessor.read_field("pki/cert/ca", "certificate").await?;
    assert_eq!(value, "-----BEGIN CERTIFICATE-----");
    Ok(())
}

#[tokio::test]
async fn non_string_fields_surface_as_json_text() -> anyhow::Result<()> {
    let server = healthy_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/roles/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "allow_ip_sans": true }
        })))
        .mount(&server)
        .await;

    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    let value = accessor.read_field("pki/roles/nodes", "allow_ip_sans").await?;
    assert_eq!(value, "true");
    Ok(())
}

#[tokio::test]
async fn missing_field_is_reported_as_such() -> anyhow::Result<()> {
    let server = healthy_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/cert/ca"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    let err = accessor.read_field("pki/cert/ca", "certificate").await.unwrap_err();
    assert!(matches!(err, AccessorError::MissingField { .. }));
    Ok(())
}

#[tokio::test]
async fn vault_error_bodies_are_carried_in_http_errors() -> anyhow::Result<()> {
    let server = healthy_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/pki/cert/ca"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    let err = accessor.read_field("pki/cert/ca", "certificate").await.unwrap_err();
    match err {
        AccessorError::Http { status, message, .. } => {
            assert_eq!(status, 403);
            assert!(message.contains("permission denied"));
        }
        other => panic!("expected Http error, got: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn write_submits_payload_and_returns_data_fields() -> anyhow::Result<()> {
    let server = healthy_server().await;
    Mock::given(method("POST"))
        .and(path("/v1/pki/issue/nodes"))
        .and(header("X-Vault-Token", "test-token"))
        .and(body_json(json!({"common_name": "node1", "ip_sans": "10.0.0.1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "certificate": "CERT",
                "private_key": "KEY",
                "issuing_ca": "CA",
                "expiration": 1893456000
            }
        })))
        .mount(&server)
        .await;

    let accessor = VaultAccessor::connect(&server.uri(), "test-token".into()).await?;
    let payload = HashMap::from([
        ("common_name".to_string(), "node1".to_string()),
        ("ip_sans".to_string(), "10.0.0.1".to_string()),
    ]);
    let response = accessor.write("pki/issue/nodes", &payload).await?;

    assert_eq!(response["certificate"], "CERT");
    assert_eq!(response["private_key"], "KEY");
    // Non-string fields are preserved as their JSON serialization.
    assert_eq!(response["expiration"], "1893456000");
    Ok(())
}
