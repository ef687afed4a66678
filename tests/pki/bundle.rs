use std::fs;
use std::sync::Arc;

use uuid::Uuid;

use trustplane::pki::codec::parse_certificate_chain;
use trustplane::pki::{CertificateProvider, PkiError, VaultPkiParams, VaultPkiProvider};
use trustplane::secrets::MockAccessor;

use super::support::self_signed_pem;

fn vault_params() -> VaultPkiParams {
    VaultPkiParams {
        address: "http://127.0.0.1:8200".to_string(),
        token: "test-token".into(),
        mount_path: "pki/".to_string(),
        role: "nodes".to_string(),
    }
}

async fn provider_with(accessor: MockAccessor) -> VaultPkiProvider {
    let accessor = accessor.with_read("pki/roles/nodes", "allow_ip_sans", "true");
    VaultPkiProvider::connect(Uuid::new_v4(), vault_params(), Arc::new(accessor))
        .await
        .expect("provider construction")
}

/// Quote and newline-escape a chain the way Vault's API surfaces it.
fn as_vault_chain_response(pems: &[&str]) -> String {
    format!("\"{}\"", pems.concat().replace('\n', "\\n"))
}

#[tokio::test]
async fn bundle_is_ca_first_then_chain_in_backend_order() -> anyhow::Result<()> {
    let a = self_signed_pem("authority-a")?;
    let b = self_signed_pem("intermediate-b")?;
    let c = self_signed_pem("intermediate-c")?;

    let provider = provider_with(
        MockAccessor::new()
            .with_read("pki/cert/ca", "certificate", a.as_str())
            .with_read(
                "pki/cert/ca_chain",
                "certificate",
                as_vault_chain_response(&[b.as_str(), c.as_str()]),
            ),
    )
    .await;

    let dir = tempfile::tempdir()?;
    let tenant = Uuid::new_v4();
    let authority = Uuid::new_v4();
    let paths = provider.dump_ca_cert_bundle(dir.path(), tenant, authority).await?;

    assert!(paths.ca_key_path.is_none());
    assert!(paths.bundle_path.ends_with(
        std::path::PathBuf::from(tenant.to_string())
            .join(authority.to_string())
            .join("ca.root.crt")
    ));

    let written = parse_certificate_chain(&fs::read_to_string(&paths.bundle_path)?)?;
    let names: Vec<String> =
        written.iter().map(|c| c.subject_common_name().unwrap()).collect();
    assert_eq!(names, vec!["authority-a", "intermediate-b", "intermediate-c"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_of_the_ca_in_the_chain_is_not_deduplicated() -> anyhow::Result<()> {
    let a = self_signed_pem("authority-a")?;
    let c = self_signed_pem("intermediate-c")?;

    let provider = provider_with(
        MockAccessor::new()
            .with_read("pki/cert/ca", "certificate", a.as_str())
            .with_read(
                "pki/cert/ca_chain",
                "certificate",
                as_vault_chain_response(&[a.as_str(), c.as_str()]),
            ),
    )
    .await;

    let dir = tempfile::tempdir()?;
    let paths =
        provider.dump_ca_cert_bundle(dir.path(), Uuid::new_v4(), Uuid::new_v4()).await?;

    let written = parse_certificate_chain(&fs::read_to_string(&paths.bundle_path)?)?;
    let names: Vec<String> =
        written.iter().map(|c| c.subject_common_name().unwrap()).collect();
    assert_eq!(names, vec!["authority-a", "authority-a", "intermediate-c"]);
    Ok(())
}

#[tokio::test]
async fn empty_chain_yields_a_root_only_bundle() -> anyhow::Result<()> {
    let a = self_signed_pem("authority-a")?;

    let provider = provider_with(
        MockAccessor::new()
            .with_read("pki/cert/ca", "certificate", a.as_str())
            .with_read("pki/cert/ca_chain", "certificate", "\"\""),
    )
    .await;

    let dir = tempfile::tempdir()?;
    let paths =
        provider.dump_ca_cert_bundle(dir.path(), Uuid::new_v4(), Uuid::new_v4()).await?;

    let written = parse_certificate_chain(&fs::read_to_string(&paths.bundle_path)?)?;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].subject_common_name()?, "authority-a");
    Ok(())
}

#[tokio::test]
async fn retrieval_failure_reads_as_failed_to_extract() -> anyhow::Result<()> {
    // No cert/ca read configured: extraction fails before any write happens.
    let provider = provider_with(MockAccessor::new()).await;

    let dir = tempfile::tempdir()?;
    let err = provider
        .dump_ca_cert_bundle(dir.path(), Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, PkiError::ChainRetrieval { .. }));
    let text = err.to_string();
    assert!(text.contains("hashicorp_vault"));
    assert!(text.contains("failed to extract"));
    Ok(())
}

#[tokio::test]
async fn same_identifiers_always_map_to_the_same_bundle_path() -> anyhow::Result<()> {
    let a = self_signed_pem("authority-a")?;
    let provider = provider_with(
        MockAccessor::new()
            .with_read("pki/cert/ca", "certificate", a.as_str())
            .with_read("pki/cert/ca_chain", "certificate", ""),
    )
    .await;

    let dir = tempfile::tempdir()?;
    let tenant = Uuid::new_v4();
    let authority = Uuid::new_v4();

    let first = provider.dump_ca_cert_bundle(dir.path(), tenant, authority).await?;
    let second = provider.dump_ca_cert_bundle(dir.path(), tenant, authority).await?;
    assert_eq!(first.bundle_path, second.bundle_path);
    Ok(())
}
