use der::asn1::OctetString;
use log::debug;
use rand::TryRngCore;
use rand::rngs::OsRng;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet,
    KeyUsage, KeyUsages, SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::{DEFAULT_VALIDITY_DAYS, DistinguishedName, ExtensionParam, Validity};
use crate::config::CertificateConfig;
use crate::error::{CertMintError, Result};

/// Serial numbers are drawn uniformly from `[0, 2^128)`.
pub const SERIAL_NUMBER_BYTES: usize = 16;

/// Key usage every template starts from, before role adjustments.
pub fn baseline_key_usage() -> FlagSet<KeyUsages> {
    KeyUsages::KeyEncipherment | KeyUsages::DigitalSignature | KeyUsages::KeyAgreement
}

/// Draws a fresh serial number from the operating system's secure RNG.
pub fn random_serial() -> Result<[u8; SERIAL_NUMBER_BYTES]> {
    let mut serial = [0u8; SERIAL_NUMBER_BYTES];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| CertMintError::RandomnessError(e.to_string()))?;
    Ok(serial)
}

/// The unsigned description of a certificate about to be issued.
///
/// Built once per issuance and consumed by an [`Issuer`](crate::issuer::Issuer),
/// which adds the issuer name, the subject key and the key identifiers.
///
/// # Fields
/// * `serial_number` - Random 128-bit serial, big-endian.
/// * `subject` - The distinguished name of the certificate subject.
/// * `validity` - One year starting at issuance.
/// * `key_usage` - Key usage flags.
/// * `extended_key_usage` - Extended key usage purposes, empty for none.
/// * `subject_alt_names` - IP and DNS subject alternative names.
/// * `is_ca` - Whether the certificate may sign others.
/// * `basic_constraints_valid` - Whether a BasicConstraints extension is emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub serial_number: [u8; SERIAL_NUMBER_BYTES],
    pub subject: DistinguishedName,
    pub validity: Validity,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub subject_alt_names: SubjectAltName,
    pub is_ca: bool,
    pub basic_constraints_valid: bool,
}

impl CertificateTemplate {
    /// Creates the canonical template for `config`: subject copied over, fresh
    /// serial, one-year validity and the baseline key usage.
    ///
    /// Role-specific fields (extended key usage, SANs, CA flag) are left empty.
    pub fn new(config: &CertificateConfig) -> Result<Self> {
        let serial_number = random_serial()?;
        debug!("drew serial number {}", hex(&serial_number));
        Ok(Self {
            serial_number,
            subject: config.subject.clone(),
            validity: Validity::for_days(DEFAULT_VALIDITY_DAYS),
            key_usage: baseline_key_usage(),
            extended_key_usage: Vec::new(),
            subject_alt_names: SubjectAltName::default(),
            is_ca: false,
            basic_constraints_valid: true,
        })
    }

    /// Turns the template into a certificate authority: CA flag set,
    /// certificate signing added to the key usage, any extended key usage.
    pub fn make_authority(&mut self) {
        self.is_ca = true;
        self.basic_constraints_valid = true;
        self.key_usage |= KeyUsages::KeyCertSign;
        self.extended_key_usage = vec![ExtendedKeyUsageOption::Any];
        self.subject_alt_names = SubjectAltName::default();
    }

    /// The extensions this template encodes to, in emission order.
    pub fn extensions(
        &self,
        subject_key_id: Vec<u8>,
        authority_key_id: Option<Vec<u8>>,
    ) -> Result<Vec<ExtensionParam>> {
        let mut extensions = Vec::new();
        if self.basic_constraints_valid {
            let basic_constraints = BasicConstraints {
                is_ca: self.is_ca,
                max_path_length: None,
            };
            extensions.push(ExtensionParam::from_extension(&basic_constraints, true)?);
        }
        if !self.key_usage.is_empty() {
            extensions.push(ExtensionParam::from_extension(&KeyUsage(self.key_usage), true)?);
        }
        if !self.extended_key_usage.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: self.extended_key_usage.clone(),
            };
            extensions.push(ExtensionParam::from_extension(&extended_key_usage, false)?);
        }
        extensions.push(ExtensionParam::from_extension(
            &SubjectKeyIdentifier(subject_key_id),
            false,
        )?);
        if let Some(key_identifier) = authority_key_id {
            extensions.push(ExtensionParam::from_extension(
                &AuthorityKeyIdentifier { key_identifier },
                false,
            )?);
        }
        if !self.subject_alt_names.is_empty() {
            // An empty subject leaves the SAN as the only identity, which must be critical.
            let critical = self.subject == DistinguishedName::default();
            extensions.push(ExtensionParam::from_extension(
                &self.subject_alt_names,
                critical,
            )?);
        }
        Ok(extensions)
    }

    /// Converts the template into a `TbsCertificateInner` for DER encoding.
    ///
    /// Any field the encoder rejects surfaces as [`CertMintError::SigningError`].
    pub fn to_tbs_certificate_inner(
        &self,
        issuer: Name,
        subject_public_key_info: SubjectPublicKeyInfoOwned,
        signature_algorithm: SignatureAlgorithm,
        extensions: Vec<ExtensionParam>,
    ) -> Result<TbsCertificateInner> {
        let rejected = |e: der::Error| CertMintError::SigningError(e.to_string());

        let extensions = extensions
            .into_iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value).map_err(rejected)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: x509_cert::time::Time::try_from(std::time::SystemTime::from(
                self.validity.not_before,
            ))
            .map_err(rejected)?,
            not_after: x509_cert::time::Time::try_from(std::time::SystemTime::from(
                self.validity.not_after,
            ))
            .map_err(rejected)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&self.serial_number).map_err(rejected)?,
            signature: signature_algorithm.into(),
            issuer,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::ToAndFromX509Extension;

    #[test]
    fn template_starts_from_baseline() {
        let config = CertificateConfig::default();
        let template = CertificateTemplate::new(&config).unwrap();
        assert_eq!(template.key_usage, baseline_key_usage());
        assert!(template.extended_key_usage.is_empty());
        assert!(template.subject_alt_names.is_empty());
        assert!(!template.is_ca);
        assert!(template.basic_constraints_valid);
        assert_eq!(template.subject, config.subject);
        assert_eq!(
            template.validity.not_after - template.validity.not_before,
            time::Duration::days(365)
        );
    }

    #[test]
    fn serials_differ_between_templates() {
        let config = CertificateConfig::default();
        let a = CertificateTemplate::new(&config).unwrap();
        let b = CertificateTemplate::new(&config).unwrap();
        assert_ne!(a.serial_number, b.serial_number);
    }

    #[test]
    fn authority_adds_cert_sign_and_any_usage() {
        let mut template = CertificateTemplate::new(&CertificateConfig::default()).unwrap();
        template.make_authority();
        assert!(template.is_ca);
        assert!(template.key_usage.contains(KeyUsages::KeyCertSign));
        assert!(template.key_usage.contains(KeyUsages::DigitalSignature));
        assert_eq!(template.extended_key_usage, vec![ExtendedKeyUsageOption::Any]);
    }

    #[test]
    fn extensions_skip_empty_sets() {
        let mut template = CertificateTemplate::new(&CertificateConfig::default()).unwrap();
        template.key_usage = FlagSet::default();
        let extensions = template.extensions(vec![1; 20], None).unwrap();
        let oids: Vec<_> = extensions.iter().map(|ext| ext.oid).collect();
        assert_eq!(
            oids,
            vec![BasicConstraints::OID, SubjectKeyIdentifier::OID]
        );
    }

    #[test]
    fn san_is_critical_without_subject() {
        let mut template = CertificateTemplate::new(&CertificateConfig::default()).unwrap();
        template.subject = DistinguishedName::default();
        template.subject_alt_names.dns_names.push("localhost".to_string());
        let extensions = template.extensions(vec![1; 20], Some(vec![2; 20])).unwrap();
        let san = extensions
            .iter()
            .find(|ext| ext.oid == SubjectAltName::OID)
            .unwrap();
        assert!(san.critical);
        assert!(extensions.iter().any(|ext| ext.oid == AuthorityKeyIdentifier::OID));
    }
}
