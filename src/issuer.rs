use der::Encode;
use log::{debug, warn};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::{Certificate, CertificateWithPrivateKey, key_identifier};
use crate::config::CaMaterial;
use crate::error::{CertMintError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::template::CertificateTemplate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name written into issued certificates.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the identifier of the signing key, if it should be recorded.
    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>>;

    /// Issues a certificate for `subject_key` from `template`.
    ///
    /// # Arguments
    /// * `template` - Subject, validity, serial and usage of the new certificate.
    /// * `subject_key` - The public key being certified.
    ///
    /// # Returns
    /// The signed certificate, or [`CertMintError::SigningError`] when the
    /// template cannot be encoded or signed.
    fn issue(&self, template: &CertificateTemplate, subject_key: &PublicKey) -> Result<Certificate> {
        let signature_algorithm = self.signing_key().signature_algorithm();
        let subject_public_key_info = subject_key.to_spki()?;
        let extensions = template
            .extensions(
                key_identifier(&subject_public_key_info),
                self.authority_key_identifier()?,
            )
            .map_err(|e| CertMintError::SigningError(e.to_string()))?;

        let tbs_certificate = template.to_tbs_certificate_inner(
            self.issuer_name()?,
            subject_public_key_info,
            signature_algorithm,
            extensions,
        )?;
        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| CertMintError::SigningError(e.to_string()))?;

        let signature = self.signing_key().sign_data(&tbs_der)?;

        let inner = CertificateInner {
            tbs_certificate,
            signature_algorithm: signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| CertMintError::SigningError(e.to_string()))?,
        };

        Ok(Certificate { inner })
    }
}

// Helper struct for self-signed certificates
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: Name,
    pub(crate) key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.cert.subject().clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn authority_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        self.cert.subject_key_identifier().map(Some)
    }
}

impl CertificateWithPrivateKey {
    /// Parses PEM CA material. Any failure is an [`CertMintError::InvalidIssuerError`].
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let invalid = |what: &str, e: CertMintError| {
            CertMintError::InvalidIssuerError(format!("{what}: {e}"))
        };
        let cert = Certificate::from_pem(cert_pem).map_err(|e| invalid("CA certificate", e))?;
        let key = KeyPair::from_pem(key_pem).map_err(|e| invalid("CA private key", e))?;
        Self::new(cert, key)
    }
}

/// Who signs the certificate being issued.
#[derive(Debug, Clone)]
pub enum ResolvedIssuer {
    /// The certificate signs itself with the subject's own key.
    SelfSigned,
    /// The supplied CA signs; its subject becomes the issuer name.
    ChainSigned(CertificateWithPrivateKey),
}

impl ResolvedIssuer {
    /// Signs `template` for `subject_key` with whichever identity was resolved.
    pub fn issue(&self, template: &CertificateTemplate, subject_key: &KeyPair) -> Result<Certificate> {
        match self {
            ResolvedIssuer::SelfSigned => Certificate::new_self_signed(template, subject_key),
            ResolvedIssuer::ChainSigned(ca) => ca.issue(template, &subject_key.public_key()),
        }
    }
}

/// Determines the signing identity from optional CA material.
///
/// Absent material means self-signed. Present material must parse, and its key
/// must belong to its certificate; otherwise [`CertMintError::InvalidIssuerError`].
pub fn resolve_issuer(material: Option<&CaMaterial>) -> Result<ResolvedIssuer> {
    let Some(material) = material else {
        debug!("no CA material, issuing self-signed");
        return Ok(ResolvedIssuer::SelfSigned);
    };
    let ca = CertificateWithPrivateKey::from_pem(material.certificate_pem(), material.key_pem())?;
    if !ca.cert.is_ca().unwrap_or(false) {
        warn!(
            "issuer certificate {} is not marked as a CA, clients may reject the chain",
            ca.cert.subject()
        );
    }
    debug!("issuing under CA {}", ca.cert.subject());
    Ok(ResolvedIssuer::ChainSigned(ca))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;
    use crate::config::CertificateConfig;

    fn ca() -> (Certificate, KeyPair) {
        let key = KeyPair::generate_ecdsa_p256();
        let config = CertificateConfig::builder()
            .subject(DistinguishedName::builder().common_name("Resolver CA").build())
            .build();
        let mut template = CertificateTemplate::new(&config).unwrap();
        template.make_authority();
        let cert = Certificate::new_self_signed(&template, &key).unwrap();
        (cert, key)
    }

    #[test]
    fn absent_material_is_self_signed() {
        assert!(matches!(
            resolve_issuer(None).unwrap(),
            ResolvedIssuer::SelfSigned
        ));
    }

    #[test]
    fn valid_material_is_chain_signed() {
        let (cert, key) = ca();
        let material = CaMaterial::from_bytes(cert.to_pem().unwrap(), key.to_pem().unwrap());
        match resolve_issuer(Some(&material)).unwrap() {
            ResolvedIssuer::ChainSigned(resolved) => assert_eq!(resolved.cert, cert),
            ResolvedIssuer::SelfSigned => panic!("expected chain-signed issuer"),
        }
    }

    #[test]
    fn unparsable_material_is_invalid_issuer() {
        let (cert, _) = ca();
        let cases = [
            CaMaterial::from_bytes("garbage", "garbage"),
            CaMaterial::from_bytes(cert.to_pem().unwrap(), "garbage"),
        ];
        for material in cases {
            assert!(matches!(
                resolve_issuer(Some(&material)),
                Err(CertMintError::InvalidIssuerError(_))
            ));
        }
    }

    #[test]
    fn foreign_key_is_invalid_issuer() {
        let (cert, _) = ca();
        let other = KeyPair::generate_ecdsa_p256();
        let material = CaMaterial::from_bytes(cert.to_pem().unwrap(), other.to_pem().unwrap());
        assert!(matches!(
            resolve_issuer(Some(&material)),
            Err(CertMintError::InvalidIssuerError(_))
        ));
    }

    #[test]
    fn chain_signed_records_authority_key() {
        let (cert, key) = ca();
        let ca = CertificateWithPrivateKey::new(cert.clone(), key).unwrap();
        assert_eq!(
            ca.authority_key_identifier().unwrap(),
            Some(cert.subject_key_identifier().unwrap())
        );
    }
}
