//! Issuance configuration.
//!
//! A [`CertificateConfig`] is built once per issuance from defaults plus
//! overrides and never mutated afterwards. CA material is read into memory by
//! [`CaMaterial`] before the issuer ever sees it.

use std::fmt;
use std::path::Path;

use bon::Builder;
use log::{debug, warn};

use crate::cert::params::DistinguishedName;
use crate::error::{CertMintError, Result};
use crate::issue::IssuedCertificate;
use crate::key::{KeyAlgorithm, LEGACY_KEY_BITS, MIN_RSA_KEY_BITS};

/// RSA size used when none is configured.
pub const DEFAULT_KEY_BITS: usize = MIN_RSA_KEY_BITS;

/// Common name given to a CA whose subject does not name it.
pub const DEFAULT_CA_COMMON_NAME: &str = "Certification Authority";

/// Subject of a CA issued without one. Location fields stay empty.
pub fn default_ca_subject() -> DistinguishedName {
    DistinguishedName::builder()
        .common_name(DEFAULT_CA_COMMON_NAME)
        .organization(vec!["certmint".to_string()])
        .organizational_unit(vec![DEFAULT_CA_COMMON_NAME.to_string()])
        .build()
}

/// Hosts a server certificate covers when none are configured.
pub fn default_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

/// What an issued certificate is for. Decides its extension sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateRole {
    CertificateAuthority,
    #[default]
    ServerCert,
    ClientCert,
}

/// Everything one issuance needs.
///
/// ```
/// use certmint::config::{CertificateConfig, CertificateRole};
/// use certmint::cert::params::DistinguishedName;
///
/// let config = CertificateConfig::builder()
///     .hosts(vec!["api.example.com".to_string(), "10.0.0.7:8443".to_string()])
///     .subject(DistinguishedName::builder().common_name("api.example.com").build())
///     .role(CertificateRole::ServerCert)
///     .build();
/// assert_eq!(config.key_bits, certmint::config::DEFAULT_KEY_BITS);
/// ```
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct CertificateConfig {
    /// SAN source for server certificates; ignored for other roles.
    #[builder(default = default_hosts())]
    pub hosts: Vec<String>,
    #[builder(default)]
    pub subject: DistinguishedName,
    /// RSA modulus size; unused by the other algorithms.
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
    #[builder(default)]
    pub role: CertificateRole,
    /// CA that signs leaf certificates. `None` means self-signed.
    pub issuer: Option<CaMaterial>,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CertificateConfig {
    /// Rejects key sizes that key generation would refuse, before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.key_algorithm == KeyAlgorithm::Rsa && self.key_bits < MIN_RSA_KEY_BITS {
            if self.key_bits == LEGACY_KEY_BITS {
                warn!("{LEGACY_KEY_BITS}-bit RSA is a legacy default and no longer issued");
            } else {
                warn!(
                    "RSA key size {} is below the {MIN_RSA_KEY_BITS}-bit minimum",
                    self.key_bits
                );
            }
            return Err(CertMintError::KeyGenerationError(format!(
                "RSA key size {} is below {MIN_RSA_KEY_BITS} bits",
                self.key_bits
            )));
        }
        Ok(())
    }
}

/// PEM-encoded CA certificate and private key, held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct CaMaterial {
    certificate: Vec<u8>,
    key: Vec<u8>,
}

impl fmt::Debug for CaMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaMaterial")
            .field("certificate", &String::from_utf8_lossy(&self.certificate))
            .field("key", &"<redacted>")
            .finish()
    }
}

impl CaMaterial {
    pub fn from_bytes(certificate: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            certificate: certificate.into(),
            key: key.into(),
        }
    }

    /// Reads the certificate and key from two files.
    pub fn from_files(certificate: impl AsRef<Path>, key: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            certificate: read(certificate.as_ref())?,
            key: read(key.as_ref())?,
        })
    }

    /// Reads the certificate and key from the files named by two environment variables.
    pub fn from_env(certificate_var: &str, key_var: &str) -> Result<Self> {
        let certificate = env_path(certificate_var)?;
        let key = env_path(key_var)?;
        Self::from_files(certificate, key)
    }

    /// Adopts the material `provider` returns, only if it succeeds with
    /// non-empty certificate and key.
    pub fn from_provider<F, E>(provider: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<(Vec<u8>, Vec<u8>), E>,
        E: fmt::Display,
    {
        let (certificate, key) = provider()
            .map_err(|e| CertMintError::IoError(format!("CA material provider failed: {e}")))?;
        if certificate.is_empty() || key.is_empty() {
            return Err(CertMintError::IoError(
                "CA material provider returned empty certificate or key".to_string(),
            ));
        }
        Ok(Self { certificate, key })
    }

    pub fn certificate_pem(&self) -> &[u8] {
        &self.certificate
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key
    }
}

impl From<&IssuedCertificate> for CaMaterial {
    fn from(issued: &IssuedCertificate) -> Self {
        Self::from_bytes(
            issued.certificate_pem.as_bytes(),
            issued.private_key_pem.as_bytes(),
        )
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    debug!("reading CA material from {}", path.display());
    std::fs::read(path).map_err(|e| CertMintError::IoError(format!("{}: {e}", path.display())))
}

fn env_path(var: &str) -> Result<String> {
    std::env::var(var).map_err(|e| CertMintError::IoError(format!("${var}: {e}")))
}
