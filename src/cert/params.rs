use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, PrintableStringRef, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{CertMintError, Result};

/// Validity window of every issued certificate.
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Distinguished name of a certificate subject.
///
/// Every attribute except the common name may carry several values. An empty
/// common name is left out of the encoded name.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The countries (C).
/// * `province` - The states or provinces (ST).
/// * `locality` - The localities or cities (L).
/// * `organization` - The organizations (O).
/// * `organizational_unit` - The organizational units (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(default, into)]
    pub common_name: String,
    #[builder(default)]
    pub country: Vec<String>,
    #[builder(default)]
    pub province: Vec<String>,
    #[builder(default)]
    pub locality: Vec<String>,
    #[builder(default)]
    pub organization: Vec<String>,
    #[builder(default)]
    pub organizational_unit: Vec<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    ///
    /// Each value becomes its own RDN, in the order C, ST, L, O, OU, CN.
    /// Countries are PrintableStrings, everything else UTF8String.
    pub fn as_x509_name(&self) -> Result<Name> {
        let mut rdns = Vec::new();
        for country in &self.country {
            PrintableStringRef::new(country).map_err(|_| {
                CertMintError::SigningError(format!("country {country:?} is not printable"))
            })?;
            rdns.push(single_rdn(COUNTRY, Tag::PrintableString, country)?);
        }
        let attributes = [
            (PROVINCE, &self.province),
            (LOCALITY, &self.locality),
            (ORGANIZATION, &self.organization),
            (ORGANIZATIONAL_UNIT, &self.organizational_unit),
        ];
        for (oid, values) in attributes {
            for value in values {
                rdns.push(single_rdn(oid, Tag::Utf8String, value)?);
            }
        }
        if !self.common_name.is_empty() {
            rdns.push(single_rdn(COMMON_NAME, Tag::Utf8String, &self.common_name)?);
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Attributes outside the six supported types are skipped.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = String::from_utf8_lossy(attr.value.value()).into_owned();
                match attr.oid {
                    COUNTRY => dn.country.push(value),
                    PROVINCE => dn.province.push(value),
                    LOCALITY => dn.locality.push(value),
                    ORGANIZATION => dn.organization.push(value),
                    ORGANIZATIONAL_UNIT => dn.organizational_unit.push(value),
                    COMMON_NAME => dn.common_name = value,
                    _ => {}
                }
            }
        }
        dn
    }
}

fn single_rdn(oid: ObjectIdentifier, tag: Tag, value: &str) -> Result<RelativeDistinguishedName> {
    let rejected = |e: der::Error| {
        CertMintError::SigningError(format!("cannot encode name attribute {oid}: {e}"))
    };
    let value = Any::new(tag, value.as_bytes()).map_err(rejected)?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }]).map_err(rejected)?;
    Ok(RelativeDistinguishedName(set))
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// The start is truncated to whole seconds, the precision X.509 times
    /// carry, so the encoded window is exactly `days` long.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        let now = now - Duration::nanoseconds(i64::from(now.nanosecond()));
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistinguishedName {
        DistinguishedName::builder()
            .common_name("Example CA")
            .country(vec!["US".to_string()])
            .province(vec!["California".to_string()])
            .locality(vec!["San Francisco".to_string()])
            .organization(vec!["Example, Inc.".to_string(), "Example Labs".to_string()])
            .organizational_unit(vec!["IT".to_string()])
            .build()
    }

    #[test]
    fn name_round_trips_multi_valued_attributes() {
        let dn = sample();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 7);
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn empty_common_name_is_omitted() {
        let dn = DistinguishedName::builder()
            .organization(vec!["Org".to_string()])
            .build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 1);
        assert!(DistinguishedName::from_x509_name(&name).common_name.is_empty());
    }

    #[test]
    fn rdn_order_is_country_first_common_name_last() {
        let name = sample().as_x509_name().unwrap();
        let oids: Vec<_> = name.0.iter().map(|rdn| rdn.0.as_slice()[0].oid).collect();
        assert_eq!(oids.first(), Some(&COUNTRY));
        assert_eq!(oids.last(), Some(&COMMON_NAME));
    }

    #[test]
    fn unprintable_country_is_a_signing_error() {
        let dn = DistinguishedName::builder()
            .country(vec!["Ü*".to_string()])
            .build();
        assert!(matches!(
            dn.as_x509_name(),
            Err(CertMintError::SigningError(_))
        ));
    }

    #[test]
    fn validity_is_whole_seconds_and_exact() {
        let validity = Validity::for_days(DEFAULT_VALIDITY_DAYS);
        assert_eq!(validity.not_before.nanosecond(), 0);
        assert_eq!(
            validity.not_after - validity.not_before,
            Duration::days(DEFAULT_VALIDITY_DAYS)
        );
    }
}
