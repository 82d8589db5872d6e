#![allow(dead_code)]

use certmint::cert::params::DistinguishedName;
use certmint::{
    CaMaterial, CertificateConfig, CertificateRole, IssuedCertificate, KeyAlgorithm, issue_ca,
    issue_certificate,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn subject(common_name: &str) -> DistinguishedName {
    DistinguishedName::builder().common_name(common_name).build()
}

/// Issues a P-256 root CA named `myca.local`.
pub fn generate_ca() -> IssuedCertificate {
    init_logging();
    let config = CertificateConfig::builder()
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .subject(subject("myca.local"))
        .build();
    issue_ca(&config).unwrap()
}

/// Issues a P-256 leaf certificate, chained to `ca` when one is given.
pub fn generate_leaf(
    role: CertificateRole,
    common_name: &str,
    hosts: &[&str],
    ca: Option<&IssuedCertificate>,
) -> IssuedCertificate {
    init_logging();
    let config = CertificateConfig::builder()
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .subject(subject(common_name))
        .hosts(hosts.iter().map(|h| h.to_string()).collect())
        .role(role)
        .maybe_issuer(ca.map(CaMaterial::from))
        .build();
    issue_certificate(&config).unwrap()
}
