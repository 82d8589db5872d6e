//! # CertMint - Programmatic X.509 Issuance
//!
//! CertMint issues the certificates a service needs to bootstrap TLS without
//! an external PKI: a self-signed certificate authority, and server or client
//! certificates that are either self-signed or signed by a supplied CA. It is
//! built on the RustCrypto crates; openssl is only used to cross-check the
//! output in tests.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 to 16384-bit keys, 2048 by default
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Output
//!
//! Every issuance returns an [`IssuedCertificate`] holding two PEM documents:
//! the certificate (`CERTIFICATE`) and its private key (`RSA PRIVATE KEY` for
//! RSA, `PRIVATE KEY` otherwise). Certificates are valid for one year from
//! the moment of issuance and carry a random 128-bit serial number.
//!
//! ## Quick Start
//!
//! ### Issuing a Certificate Authority
//!
//! ```rust,no_run
//! use certmint::{CertificateConfig, issue_ca};
//! use certmint::cert::params::DistinguishedName;
//!
//! # fn main() -> Result<(), certmint::CertMintError> {
//! let config = CertificateConfig::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .common_name("Example Root")
//!             .organization(vec!["Example Corp".to_string()])
//!             .build(),
//!     )
//!     .build();
//!
//! let ca = issue_ca(&config)?;
//! println!("{}", ca.certificate_pem);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing a Server Certificate Under That CA
//!
//! ```rust,no_run
//! use certmint::{CaMaterial, CertificateConfig, CertificateRole, issue_ca, issue_certificate};
//! use certmint::cert::params::DistinguishedName;
//!
//! # fn main() -> Result<(), certmint::CertMintError> {
//! let ca = issue_ca(&CertificateConfig::default())?;
//!
//! let config = CertificateConfig::builder()
//!     .hosts(vec!["api.example.com".to_string(), "10.0.0.7:8443".to_string()])
//!     .subject(DistinguishedName::builder().common_name("api.example.com").build())
//!     .role(CertificateRole::ServerCert)
//!     .issuer(CaMaterial::from(&ca))
//!     .build();
//!
//! let server = issue_certificate(&config)?;
//! server.certificate()?.verify_signed_by(&ca.certificate()?)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Loading CA Material From Disk
//!
//! ```rust,no_run
//! use certmint::{CaMaterial, CertificateConfig, CertificateRole, issue_certificate};
//!
//! # fn main() -> Result<(), certmint::CertMintError> {
//! let config = CertificateConfig::builder()
//!     .role(CertificateRole::ClientCert)
//!     .issuer(CaMaterial::from_files("ca.pem", "ca.key")?)
//!     .build();
//! let client = issue_certificate(&config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns a [`CertMintError`] naming the stage that
//! failed. An issuance either returns both PEM documents or nothing at all.
//!
//! ```rust
//! use certmint::{CaMaterial, CertificateConfig, CertMintError, issue_certificate};
//!
//! let config = CertificateConfig::builder()
//!     .issuer(CaMaterial::from_bytes("not a certificate", "not a key"))
//!     .build();
//! match issue_certificate(&config) {
//!     Err(CertMintError::InvalidIssuerError(msg)) => println!("bad CA: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`issue`]: The issuance entry points
//! - [`config`]: Issuance configuration and CA material loading
//! - [`template`]: The unsigned certificate template and serial numbers
//! - [`hosts`]: Host string classification into subject alternative names
//! - [`issuer`]: Signing identities, self-signed or chained to a CA
//! - [`key`]: Key generation, import/export and signatures
//! - [`cert`]: Certificate encoding, decoding and inspection
//! - [`trust`]: Trust pools loaded from PEM bundles
//! - [`error`]: Error types

pub mod cert;
pub mod config;
pub mod error;
pub mod hosts;
pub mod issue;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod template;
pub mod trust;

pub use config::{CaMaterial, CertificateConfig, CertificateRole};
pub use error::CertMintError;
pub use issue::{IssuedCertificate, issue_ca, issue_certificate};
pub use key::KeyAlgorithm;
pub use trust::TrustPool;
