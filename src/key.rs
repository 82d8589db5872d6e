use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use log::debug;
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, PrivateKeyInfo};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    signature::{SignatureEncoding, Signer, Verifier},
};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use der::{Decode, Encode};

use crate::cert::SignatureAlgorithm;
use crate::error::{CertMintError, Result};
use crate::pem_utils::{der_to_pem, first_pem_block};

/// Smallest RSA modulus accepted for a generated key.
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Largest RSA modulus accepted for a generated key.
pub const MAX_RSA_KEY_BITS: usize = 16384;

/// RSA size older deployments defaulted to. Too weak to issue with;
/// configurations that still ask for it are rejected at key generation.
pub const LEGACY_KEY_BITS: usize = 1024;

pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Algorithm of a generated key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    /// RSA with a configurable modulus size.
    #[default]
    Rsa,
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

/// Supported key types for certificate operations.
#[derive(Clone, Debug)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate a fresh key pair. `rsa_bits` only applies to [`KeyAlgorithm::Rsa`].
    pub fn generate(algorithm: KeyAlgorithm, rsa_bits: usize) -> Result<Self> {
        debug!("generating {algorithm:?} key pair");
        match algorithm {
            KeyAlgorithm::Rsa => Self::generate_rsa(rsa_bits),
            KeyAlgorithm::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeyAlgorithm::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
            KeyAlgorithm::Ed25519 => Ok(Self::generate_ed25519()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    ///
    /// Sizes outside `MIN_RSA_KEY_BITS..=MAX_RSA_KEY_BITS` are rejected before
    /// any entropy is consumed.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if !(MIN_RSA_KEY_BITS..=MAX_RSA_KEY_BITS).contains(&bits) {
            return Err(CertMintError::KeyGenerationError(format!(
                "RSA key size {bits} is outside {MIN_RSA_KEY_BITS}..={MAX_RSA_KEY_BITS} bits"
            )));
        }
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key: Ed25519SigningKey = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { .. } => KeyAlgorithm::Rsa,
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// The algorithm this key signs certificates with.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// Signs `data` with the digest implied by [`Self::signature_algorithm`].
    ///
    /// ECDSA signatures are returned DER encoded, as X.509 expects.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_error = |e: rsa::signature::Error| CertMintError::SigningError(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature: ed25519_dalek::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Encodes the private key as PEM: PKCS#1 for RSA, PKCS#8 otherwise.
    pub fn to_pem(&self) -> Result<String> {
        let encoding_error = |e: pkcs8::Error| CertMintError::EncodingError(e.to_string());
        let (label, der) = match self {
            KeyPair::Rsa { private, .. } => (
                RSA_PRIVATE_KEY_LABEL,
                private
                    .to_pkcs1_der()
                    .map_err(|e| CertMintError::EncodingError(e.to_string()))?,
            ),
            KeyPair::EcdsaP256 { signing_key, .. } => (
                PRIVATE_KEY_LABEL,
                signing_key.to_pkcs8_der().map_err(encoding_error)?,
            ),
            KeyPair::EcdsaP384 { signing_key, .. } => (
                PRIVATE_KEY_LABEL,
                signing_key.to_pkcs8_der().map_err(encoding_error)?,
            ),
            // v1 PKCS#8 without the public key field; OpenSSL rejects the v2 form.
            KeyPair::Ed25519 { signing_key } => (
                PRIVATE_KEY_LABEL,
                ed25519_dalek::pkcs8::KeypairBytes {
                    secret_key: signing_key.to_bytes(),
                    public_key: None,
                }
                .to_pkcs8_der()
                .map_err(encoding_error)?,
            ),
        };
        Ok(der_to_pem(der.as_bytes(), label))
    }

    /// Parses the first private key block found in `pem`.
    ///
    /// Accepts PKCS#1 RSA, SEC1 EC and PKCS#8 (RSA, P-256, P-384, Ed25519) keys.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (label, der) = first_pem_block(
            pem,
            &[RSA_PRIVATE_KEY_LABEL, EC_PRIVATE_KEY_LABEL, PRIVATE_KEY_LABEL],
        )?;
        match label.as_str() {
            RSA_PRIVATE_KEY_LABEL => Self::from_rsa_private(RsaPrivateKey::from_pkcs1_der(&der)?),
            EC_PRIVATE_KEY_LABEL => Self::import_from_sec1_der(&der),
            _ => Self::import_from_pkcs8_der(&der),
        }
    }

    pub fn import_from_sec1_der(der: &[u8]) -> Result<Self> {
        if let Ok(secret) = p256::SecretKey::from_sec1_der(der) {
            let signing_key = P256SigningKey::from(secret);
            let verifying_key = *signing_key.verifying_key();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        let secret = p384::SecretKey::from_sec1_der(der).map_err(|_| {
            CertMintError::DecodingError("EC private key is not on P-256 or P-384".to_string())
        })?;
        let signing_key = P384SigningKey::from(secret);
        let verifying_key = *signing_key.verifying_key();
        Ok(KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        })
    }

    pub fn import_from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::from_der(der)?;
        match info.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => {
                Self::from_rsa_private(RsaPrivateKey::from_pkcs8_der(der)?)
            }
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
                    let verifying_key = *signing_key.verifying_key();
                    return Ok(KeyPair::EcdsaP256 {
                        signing_key,
                        verifying_key,
                    });
                }
                let signing_key = P384SigningKey::from_pkcs8_der(der)?;
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                })
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ok(KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::from_pkcs8_der(der)?,
            }),
            other => Err(CertMintError::DecodingError(format!(
                "unsupported private key algorithm {other}"
            ))),
        }
    }

    fn from_rsa_private(private: RsaPrivateKey) -> Result<Self> {
        private.validate().map_err(decoding_error)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }
}

/// Public half of a [`KeyPair`], or a key read from a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Reads a public key out of a certificate's SubjectPublicKeyInfo.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        match spki.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => Ok(PublicKey::Rsa(
                RsaPublicKey::from_public_key_der(&der).map_err(decoding_error)?,
            )),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                if let Ok(key) = P256VerifyingKey::from_public_key_der(&der) {
                    return Ok(PublicKey::EcdsaP256(key));
                }
                P384VerifyingKey::from_public_key_der(&der)
                    .map(PublicKey::EcdsaP384)
                    .map_err(decoding_error)
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ed25519VerifyingKey::from_public_key_der(&der)
                .map(PublicKey::Ed25519)
                .map_err(decoding_error),
            other => Err(CertMintError::DecodingError(format!(
                "unsupported public key algorithm {other}"
            ))),
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::Ed25519(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
        };
        spki.map_err(|e| CertMintError::EncodingError(e.to_string()))
    }

    /// The only signature algorithm this key is checked against.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::Rsa(_) => SignatureAlgorithm::Sha256WithRSA,
            PublicKey::EcdsaP256(_) => SignatureAlgorithm::Sha256WithECDSA,
            PublicKey::EcdsaP384(_) => SignatureAlgorithm::Sha384WithECDSA,
            PublicKey::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }

    /// Checks `signature` over `data`, the counterpart of [`KeyPair::sign_data`].
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        let rejected = |e: rsa::signature::Error| {
            CertMintError::SignatureVerification(e.to_string())
        };
        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                let signature =
                    rsa::pkcs1v15::Signature::try_from(signature).map_err(rejected)?;
                verifying_key.verify(data, &signature).map_err(rejected)
            }
            PublicKey::EcdsaP256(verifying_key) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(rejected)?;
                verifying_key.verify(data, &signature).map_err(rejected)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(rejected)?;
                verifying_key.verify(data, &signature).map_err(rejected)
            }
            PublicKey::Ed25519(verifying_key) => {
                let signature = ed25519_dalek::Signature::from_slice(signature).map_err(rejected)?;
                verifying_key.verify(data, &signature).map_err(rejected)
            }
        }
    }
}

fn decoding_error(err: impl std::fmt::Display) -> CertMintError {
    CertMintError::DecodingError(err.to_string())
}
