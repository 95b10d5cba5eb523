//! PEM encoding plus certificate and key file reading.

use std::fs;
use std::path::Path;

use base64::Engine;
use rcgen::KeyPair;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Certificate, PrivateKey};

/// PEM label for certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// PEM label for unencrypted PKCS#8 private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Encodes DER bytes as a PEM block with the given label.
#[must_use]
pub fn encode(label: &str, der: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(der);
    let body = b64
        .as_bytes()
        .chunks(64)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

/// Decodes the first PEM block in `text`, returning its label and contents.
///
/// # Errors
///
/// Returns [`Error::Parse`] if no PEM block is found.
pub fn decode(text: &[u8]) -> Result<(String, Vec<u8>)> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(text)
        .map_err(|e| Error::Parse(format!("invalid PEM: {e}")))?;
    Ok((pem.label, pem.contents))
}

/// Reads a PEM-encoded certificate from `path`.
///
/// # Errors
///
/// Returns [`Error::Read`] if the file cannot be read and [`Error::Parse`]
/// if it does not hold a certificate.
pub fn read_certificate(path: &Path) -> Result<Certificate> {
    let bytes = fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (label, der) = decode(&bytes)?;
    if label != CERTIFICATE_LABEL {
        return Err(Error::Parse(format!(
            "{}: expected a CERTIFICATE block, found {label}",
            path.display()
        )));
    }
    debug!(path = %path.display(), "read certificate");
    Certificate::from_der(&der)
}

/// Reads an unencrypted PKCS#8 private key from `path`.
///
/// # Errors
///
/// Returns [`Error::Read`] if the file cannot be read and [`Error::Parse`]
/// if the key cannot be decoded.
pub fn read_private_key(path: &Path) -> Result<PrivateKey> {
    let text = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let key_pair = KeyPair::from_pem(&text)
        .map_err(|e| Error::Parse(format!("{}: failed to parse private key: {e}", path.display())))?;
    debug!(path = %path.display(), "read private key");
    Ok(PrivateKey::new(key_pair.serialize_der()))
}
