//! Trust pools assembled from PEM files.

use std::path::Path;

use log::debug;

use crate::cert::Certificate;
use crate::error::{CertMintError, Result};
use crate::pem_utils::{CERTIFICATE_LABEL, pem_blocks};

/// Certificates a caller trusts, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPool {
    certificates: Vec<Certificate>,
}

impl TrustPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every certificate from every file in `paths`.
    ///
    /// An unreadable file is an [`CertMintError::IoError`]; a file without a
    /// single parseable certificate is a [`CertMintError::TrustPoolError`].
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut pool = Self::new();
        for path in paths {
            let path = path.as_ref();
            let pem = std::fs::read(path)
                .map_err(|e| CertMintError::IoError(format!("{}: {e}", path.display())))?;
            let added = pool.add_pem(&pem).map_err(|e| {
                CertMintError::TrustPoolError(format!("{}: {e}", path.display()))
            })?;
            debug!("trusted {added} certificate(s) from {}", path.display());
        }
        Ok(pool)
    }

    /// Builds a pool from one PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let mut pool = Self::new();
        pool.add_pem(pem)?;
        Ok(pool)
    }

    /// Appends every `CERTIFICATE` block of `pem`, returning how many were added.
    ///
    /// Fails without adding anything if a block does not parse or if there is
    /// no certificate at all.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<usize> {
        let blocks = pem_blocks(pem, CERTIFICATE_LABEL)
            .map_err(|e| CertMintError::TrustPoolError(e.to_string()))?;
        if blocks.is_empty() {
            return Err(CertMintError::TrustPoolError(
                "no certificates found".to_string(),
            ));
        }
        let parsed = blocks
            .iter()
            .map(|der| Certificate::from_der(der))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| CertMintError::TrustPoolError(e.to_string()))?;
        let added = parsed.len();
        self.certificates.extend(parsed);
        Ok(added)
    }

    pub fn add(&mut self, certificate: Certificate) {
        self.certificates.push(certificate);
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// The first pooled certificate whose subject names `certificate`'s issuer.
    pub fn find_issuer(&self, certificate: &Certificate) -> Option<&Certificate> {
        self.certificates
            .iter()
            .find(|candidate| candidate.subject() == certificate.issuer())
    }
}
