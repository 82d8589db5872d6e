//! Certificate issuance.
//!
//! Both entry points run one linear pipeline: template, (issuer), key pair,
//! signature, PEM. The first failing stage aborts the whole issuance.

use log::{debug, info};

use crate::cert::Certificate;
use crate::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use crate::cert::params::DistinguishedName;
use crate::config::{
    CertificateConfig, CertificateRole, DEFAULT_CA_COMMON_NAME, default_ca_subject,
};
use crate::error::Result;
use crate::hosts::classify_hosts;
use crate::issuer::resolve_issuer;
use crate::key::KeyPair;
use crate::template::CertificateTemplate;

/// A signed certificate and the private key it certifies, both PEM encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

impl IssuedCertificate {
    fn encode(cert: &Certificate, key: &KeyPair) -> Result<Self> {
        Ok(Self {
            certificate_pem: cert.to_pem()?,
            private_key_pem: key.to_pem()?,
        })
    }

    pub fn certificate_bytes(&self) -> &[u8] {
        self.certificate_pem.as_bytes()
    }

    pub fn private_key_bytes(&self) -> &[u8] {
        self.private_key_pem.as_bytes()
    }

    /// Parses the issued certificate back.
    pub fn certificate(&self) -> Result<Certificate> {
        Certificate::from_pem(self.certificate_bytes())
    }

    /// Parses the issued private key back.
    pub fn key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_pem(self.private_key_bytes())
    }
}

/// Issues a self-signed certificate authority.
///
/// Any CA material in `config` is ignored, as are its hosts and role. An
/// empty subject is replaced by [`default_ca_subject`]; a subject without a
/// common name is named [`DEFAULT_CA_COMMON_NAME`].
pub fn issue_ca(config: &CertificateConfig) -> Result<IssuedCertificate> {
    config.validate()?;
    if config.issuer.is_some() {
        debug!("CA certificates are always self-signed, ignoring supplied CA material");
    }

    let mut template = CertificateTemplate::new(config)?;
    if template.subject == DistinguishedName::default() {
        template.subject = default_ca_subject();
    } else if template.subject.common_name.is_empty() {
        template.subject.common_name = DEFAULT_CA_COMMON_NAME.to_string();
    }
    template.make_authority();

    let key = KeyPair::generate(config.key_algorithm, config.key_bits)?;
    let cert = Certificate::new_self_signed(&template, &key)?;
    let issued = IssuedCertificate::encode(&cert, &key)?;
    info!("issued CA certificate for {}", cert.subject());
    Ok(issued)
}

/// Issues a server, client or intermediate CA certificate.
///
/// The issuer is resolved before anything else so that bad CA material fails
/// the request without generating a key. Only server certificates carry the
/// configured hosts as subject alternative names.
pub fn issue_certificate(config: &CertificateConfig) -> Result<IssuedCertificate> {
    config.validate()?;
    let issuer = resolve_issuer(config.issuer.as_ref())?;

    let mut template = CertificateTemplate::new(config)?;
    match config.role {
        CertificateRole::ServerCert => {
            template.subject_alt_names = classify_hosts(&config.hosts);
            template.extended_key_usage = vec![
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::ServerAuth,
            ];
        }
        CertificateRole::ClientCert => {
            template.extended_key_usage = vec![ExtendedKeyUsageOption::ClientAuth];
            template.key_usage = KeyUsages::DigitalSignature.into();
        }
        CertificateRole::CertificateAuthority => template.make_authority(),
    }
    debug!(
        "{:?} template with {} IP and {} DNS names",
        config.role,
        template.subject_alt_names.ip_addresses.len(),
        template.subject_alt_names.dns_names.len()
    );

    let key = KeyPair::generate(config.key_algorithm, config.key_bits)?;
    let cert = issuer.issue(&template, &key)?;
    let issued = IssuedCertificate::encode(&cert, &key)?;
    info!(
        "issued {:?} certificate for {} signed by {}",
        config.role,
        cert.subject(),
        cert.issuer()
    );
    Ok(issued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaMaterial;
    use crate::error::CertMintError;
    use crate::key::KeyAlgorithm;

    fn config(role: CertificateRole) -> CertificateConfig {
        CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .subject(DistinguishedName::builder().common_name("unit").build())
            .role(role)
            .build()
    }

    #[test]
    fn ca_without_subject_gets_default_subject() {
        let config = CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .build();
        let cert = issue_ca(&config).unwrap().certificate().unwrap();
        assert_eq!(cert.subject_dn(), default_ca_subject());
        assert_eq!(cert.subject_dn().common_name, DEFAULT_CA_COMMON_NAME);
    }

    #[test]
    fn ca_without_common_name_keeps_its_other_fields() {
        let subject = DistinguishedName::builder()
            .organization(vec!["Example Corp".to_string()])
            .build();
        let config = CertificateConfig::builder()
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .subject(subject)
            .build();
        let dn = issue_ca(&config).unwrap().certificate().unwrap().subject_dn();
        assert_eq!(dn.common_name, DEFAULT_CA_COMMON_NAME);
        assert_eq!(dn.organization, vec!["Example Corp"]);
        assert!(dn.organizational_unit.is_empty());
    }

    #[test]
    fn unencodable_host_is_a_signing_error() {
        let mut config = config(CertificateRole::ServerCert);
        config.hosts = vec!["bücher.example".to_string()];
        assert!(matches!(
            issue_certificate(&config),
            Err(CertMintError::SigningError(_))
        ));
    }

    #[test]
    fn ca_issuance_ignores_supplied_material() {
        let mut config = config(CertificateRole::CertificateAuthority);
        config.issuer = Some(CaMaterial::from_bytes("garbage", "garbage"));
        let cert = issue_ca(&config).unwrap().certificate().unwrap();
        cert.verify_signed_by(&cert).unwrap();
    }

    #[test]
    fn legacy_key_size_fails_before_issuer_resolution() {
        let config = CertificateConfig::builder()
            .key_bits(crate::key::LEGACY_KEY_BITS)
            .issuer(CaMaterial::from_bytes("garbage", "garbage"))
            .build();
        assert!(matches!(
            issue_certificate(&config),
            Err(CertMintError::KeyGenerationError(_))
        ));
    }

    #[test]
    fn intermediate_ca_role_is_signed_by_the_issuer() {
        let root = issue_ca(&config(CertificateRole::CertificateAuthority)).unwrap();
        let mut intermediate = config(CertificateRole::CertificateAuthority);
        intermediate.issuer = Some(CaMaterial::from(&root));
        let cert = issue_certificate(&intermediate)
            .unwrap()
            .certificate()
            .unwrap();
        assert!(cert.is_ca().unwrap());
        assert!(cert.subject_alt_names().unwrap().is_empty());
        cert.verify_signed_by(&root.certificate().unwrap()).unwrap();
    }

    #[test]
    fn issued_key_matches_issued_certificate() {
        let issued = issue_certificate(&config(CertificateRole::ServerCert)).unwrap();
        let cert = issued.certificate().unwrap();
        assert_eq!(cert.public_key().unwrap(), issued.key_pair().unwrap().public_key());
    }

    #[test]
    fn debug_redacts_private_key() {
        let issued = issue_certificate(&config(CertificateRole::ClientCert)).unwrap();
        assert!(!format!("{issued:?}").contains("PRIVATE KEY"));
    }
}
