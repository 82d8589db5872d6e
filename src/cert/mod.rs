pub mod extensions;
pub mod params;

use der::asn1::{Any, AnyRef};
use der::{Decode, Encode, EncodePem};
use extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{DistinguishedName, ExtensionParam, Validity};
use sha1::{Digest, Sha1};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::{CertMintError, Result};
use crate::issuer::{Issuer, SelfIssuer};
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils::{CERTIFICATE_LABEL, first_pem_block};
use crate::template::CertificateTemplate;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// Pure Ed25519.
    Ed25519,
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters; ECDSA and Ed25519 carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::from(AnyRef::NULL)),
            },
            SignatureAlgorithm::Sha256WithECDSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            SignatureAlgorithm::Ed25519 => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc8410::ID_ED_25519,
                parameters: None,
            },
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for SignatureAlgorithm {
    type Error = CertMintError;

    fn try_from(value: &AlgorithmIdentifierOwned) -> Result<Self> {
        match value.oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => Ok(Self::Sha256WithRSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Ok(Self::Sha256WithECDSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Ok(Self::Sha384WithECDSA),
            const_oid::db::rfc8410::ID_ED_25519 => Ok(Self::Ed25519),
            other => Err(CertMintError::DecodingError(format!(
                "Unsupported signature algorithm {other}"
            ))),
        }
    }
}

/// SHA-1 over the subject public key bits, the usual key identifier.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM
/// formats and to inspect the fields issuance cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(der::pem::LineEnding::LF)
            .map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    /// Parses the first `CERTIFICATE` block of `pem`.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (_, der) = first_pem_block(pem, &[CERTIFICATE_LABEL])?;
        Self::from_der(&der)
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject_dn(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject())
    }

    /// Serial number as encoded, big-endian.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: OffsetDateTime::from(validity.not_before.to_system_time()),
            not_after: OffsetDateTime::from(validity.not_after.to_system_time()),
        }
    }

    /// All extensions in the order they were encoded.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(ExtensionParam::to_extension)
            .transpose()
    }

    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .extension::<BasicConstraints>()?
            .is_some_and(|bc| bc.is_ca))
    }

    pub fn key_usage(&self) -> Result<Option<FlagSet<KeyUsages>>> {
        Ok(self.extension::<KeyUsage>()?.map(|ku| ku.0))
    }

    pub fn extended_key_usage(&self) -> Result<Vec<ExtendedKeyUsageOption>> {
        Ok(self
            .extension::<ExtendedKeyUsage>()?
            .map(|eku| eku.usage)
            .unwrap_or_default())
    }

    pub fn subject_alt_names(&self) -> Result<SubjectAltName> {
        Ok(self.extension::<SubjectAltName>()?.unwrap_or_default())
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// The certificate's own key identifier, falling back to a hash of its key.
    pub fn subject_key_identifier(&self) -> Result<Vec<u8>> {
        match self.extension::<SubjectKeyIdentifier>()? {
            Some(ski) => Ok(ski.0),
            None => Ok(key_identifier(
                &self.inner.tbs_certificate.subject_public_key_info,
            )),
        }
    }

    /// Checks that `issuer` signed this certificate: the issuer name must be
    /// the issuer's subject and the signature must verify under its key.
    ///
    /// This is a single signature check; validity periods, constraints and
    /// paths are not evaluated.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        if self.issuer() != issuer.subject() {
            return Err(CertMintError::SignatureVerification(format!(
                "issuer {} does not match {}",
                self.issuer(),
                issuer.subject()
            )));
        }
        let algorithm = SignatureAlgorithm::try_from(&self.inner.signature_algorithm)?;
        let key = issuer.public_key()?;
        if key.signature_algorithm() != algorithm {
            return Err(CertMintError::SignatureVerification(format!(
                "{algorithm:?} signature cannot come from a {:?} key",
                key.signature_algorithm()
            )));
        }
        let tbs = self.inner.tbs_certificate.to_der()?;
        key.verify(&tbs, self.inner.signature.raw_bytes())
    }

    /// Creates a new self-signed certificate.
    ///
    /// # Arguments
    /// * `template` - The certificate template.
    /// * `key` - The key pair the certificate is issued for and signed with.
    pub fn new_self_signed(template: &CertificateTemplate, key: &KeyPair) -> Result<Self> {
        // For self-signed certificates, the issuer is the same as the subject
        let self_issuer = SelfIssuer {
            name: template.subject.as_x509_name()?,
            key,
        };
        self_issuer.issue(template, &key.public_key())
    }
}

/// A CA certificate together with the key it certifies.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Pairs a certificate with its key, refusing keys that the certificate
    /// does not certify.
    pub fn new(cert: Certificate, key: KeyPair) -> Result<Self> {
        let certified = cert.public_key().map_err(|e| {
            CertMintError::InvalidIssuerError(format!("unusable CA certificate key: {e}"))
        })?;
        if certified != key.public_key() {
            return Err(CertMintError::InvalidIssuerError(
                "private key does not match the certificate's public key".to_string(),
            ));
        }
        Ok(Self { cert, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CertificateConfig;

    fn self_signed(key: &KeyPair) -> Certificate {
        let config = CertificateConfig::builder()
            .subject(DistinguishedName::builder().common_name("unit.test").build())
            .build();
        let template = CertificateTemplate::new(&config).unwrap();
        Certificate::new_self_signed(&template, key).unwrap()
    }

    #[test]
    fn der_and_pem_parse_back() {
        let cert = self_signed(&KeyPair::generate_ecdsa_p256());
        assert_eq!(Certificate::from_der(&cert.to_der().unwrap()).unwrap(), cert);
        assert_eq!(
            Certificate::from_pem(cert.to_pem().unwrap().as_bytes()).unwrap(),
            cert
        );
    }

    #[test]
    fn self_signed_verifies_against_itself() {
        for key in [KeyPair::generate_ecdsa_p384(), KeyPair::generate_ed25519()] {
            let cert = self_signed(&key);
            assert_eq!(cert.issuer(), cert.subject());
            cert.verify_signed_by(&cert).unwrap();
        }
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let cert = self_signed(&KeyPair::generate_ecdsa_p256());
        let other = self_signed(&KeyPair::generate_ecdsa_p256());
        assert!(matches!(
            cert.verify_signed_by(&other),
            Err(CertMintError::SignatureVerification(_))
        ));
    }

    #[test]
    fn mismatched_key_is_not_an_issuer() {
        let cert = self_signed(&KeyPair::generate_ecdsa_p256());
        assert!(matches!(
            CertificateWithPrivateKey::new(cert, KeyPair::generate_ecdsa_p256()),
            Err(CertMintError::InvalidIssuerError(_))
        ));
    }

    #[test]
    fn rsa_signature_algorithm_has_null_parameters() {
        let id = AlgorithmIdentifierOwned::from(SignatureAlgorithm::Sha256WithRSA);
        assert!(id.parameters.is_some());
        assert_eq!(
            SignatureAlgorithm::try_from(&id).unwrap(),
            SignatureAlgorithm::Sha256WithRSA
        );
    }
}
