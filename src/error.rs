//! Errors returned by every certmint operation.

use thiserror::Error;

/// Represents errors that can occur while issuing certificates.
///
/// Every stage of issuance surfaces its failure through one of these variants
/// unchanged; nothing is retried and no partial certificate is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertMintError {
    /// The secure random source could not supply bytes.
    #[error("Randomness error: {0}")]
    RandomnessError(String),

    /// Error during key generation, including rejected key sizes.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The supplied CA certificate or key could not be used.
    #[error("Invalid issuer: {0}")]
    InvalidIssuerError(String),

    /// The certificate template was rejected while encoding or signing it.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// CA material or trust files could not be read.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A trust file held no usable certificate.
    #[error("Trust pool error: {0}")]
    TrustPoolError(String),

    /// A signature did not verify under the expected key.
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),
}

pub type Result<T> = std::result::Result<T, CertMintError>;

impl From<der::Error> for CertMintError {
    /// Converts a `der::Error` into a `CertMintError`.
    fn from(err: der::Error) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertMintError {
    fn from(err: rsa::Error) -> Self {
        CertMintError::KeyGenerationError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertMintError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertMintError {
    fn from(err: pkcs8::Error) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertMintError {
    fn from(err: pem::PemError) -> Self {
        CertMintError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for CertMintError {
    fn from(err: std::io::Error) -> Self {
        CertMintError::IoError(err.to_string())
    }
}
