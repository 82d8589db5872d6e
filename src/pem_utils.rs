use crate::error::{CertMintError, Result};

pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Returns the DER contents of every block in `input` carrying `label`, in order.
pub fn pem_blocks(input: &[u8], label: &str) -> Result<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(input)?;
    Ok(blocks
        .into_iter()
        .filter(|block| block.tag() == label)
        .map(|block| block.into_contents())
        .collect())
}

/// Returns the first block whose label is one of `labels`, with its label.
pub fn first_pem_block(input: &[u8], labels: &[&str]) -> Result<(String, Vec<u8>)> {
    pem::parse_many(input)?
        .into_iter()
        .find(|block| labels.contains(&block.tag()))
        .map(|block| (block.tag().to_string(), block.into_contents()))
        .ok_or_else(|| {
            CertMintError::DecodingError(format!("no PEM block labelled {}", labels.join(" or ")))
        })
}
