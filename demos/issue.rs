use std::path::{Path, PathBuf};

use certmint::cert::params::DistinguishedName;
use certmint::{
    CaMaterial, CertificateConfig, CertificateRole, IssuedCertificate, KeyAlgorithm, issue_ca,
    issue_certificate,
};

/// Issues a CA plus one server and one client certificate under it, and writes
/// all of them to the directory given as the first argument (default `.debug_certs`).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".debug_certs".into()));
    std::fs::create_dir_all(&out_dir)?;

    let ca = issue_ca(
        &CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .subject(
                DistinguishedName::builder()
                    .common_name("My Test CA")
                    .organization(vec!["certmint".to_string()])
                    .build(),
            )
            .build(),
    )?;

    let server = issue_certificate(
        &CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .subject(DistinguishedName::builder().common_name("myserver.local").build())
            .hosts(vec![
                "myserver.local".to_string(),
                "localhost".to_string(),
                "127.0.0.1".to_string(),
            ])
            .role(CertificateRole::ServerCert)
            .issuer(CaMaterial::from(&ca))
            .build(),
    )?;

    let client = issue_certificate(
        &CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::Ed25519)
            .subject(DistinguishedName::builder().common_name("myclient").build())
            .role(CertificateRole::ClientCert)
            .issuer(CaMaterial::from(&ca))
            .build(),
    )?;

    for (name, issued) in [("ca", &ca), ("server", &server), ("client", &client)] {
        write(&out_dir, name, issued)?;
    }
    println!("{}", server.certificate_pem);
    Ok(())
}

fn write(dir: &Path, name: &str, issued: &IssuedCertificate) -> std::io::Result<()> {
    std::fs::write(dir.join(format!("{name}_cert.pem")), &issued.certificate_pem)?;
    std::fs::write(dir.join(format!("{name}_key.pem")), &issued.private_key_pem)?;
    println!("wrote {name} certificate and key to {}", dir.display());
    Ok(())
}
