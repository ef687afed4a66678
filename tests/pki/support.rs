use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, SanType};

/// Helper for fabricating realistic backend responses: a root authority
/// that can sign leaf certificates, all as PEM strings.
pub struct TestAuthority {
    key_pair: KeyPair,
    cert: rcgen::Certificate,
}

impl TestAuthority {
    pub fn new(common_name: &str) -> anyhow::Result<Self> {
        let key_pair = KeyPair::generate()?;

        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages.push(KeyUsagePurpose::KeyCertSign);

        let cert = params.self_signed(&key_pair)?;
        Ok(Self { key_pair, cert })
    }

    pub fn ca_pem(&self) -> String {
        self.cert.pem()
    }

    /// Issue a leaf signed by this authority; returns (cert PEM, key PEM).
    pub fn issue(&self, common_name: &str, dns_sans: &[&str]) -> anyhow::Result<(String, String)> {
        let leaf_key = KeyPair::generate()?;

        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, common_name);
        for name in dns_sans {
            params.subject_alt_names.push(SanType::DnsName((*name).to_string().try_into()?));
        }

        let cert = params.signed_by(&leaf_key, &self.cert, &self.key_pair)?;
        Ok((cert.pem(), leaf_key.serialize_pem()))
    }
}

/// A standalone self-signed certificate, for building chain fixtures.
pub fn self_signed_pem(common_name: &str) -> anyhow::Result<String> {
    Ok(TestAuthority::new(common_name)?.ca_pem())
}
