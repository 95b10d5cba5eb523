//! Retrieval of an upstream authority's root certificate.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Certificate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RootResponse {
    ca: String,
}

/// Downloads the root certificate of the authority at `url`.
///
/// The TLS chain of the upstream is not trusted yet, so the download skips
/// chain verification and trust comes from the pinned `fingerprint`.
///
/// # Errors
///
/// Returns [`Error::Remote`] if the request fails and
/// [`Error::Validation`] if the fingerprint does not match.
pub fn fetch_root(url: &str, fingerprint: &str) -> Result<Certificate> {
    let endpoint = format!("{}/root/{}", url.trim_end_matches('/'), fingerprint);
    info!("Retrieving root certificate from {}", endpoint);

    let client = reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Remote(format!("failed to create client: {e}")))?;

    let response: RootResponse = client
        .get(&endpoint)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| Error::Remote(format!("GET {endpoint} failed: {e}")))?
        .json()
        .map_err(|e| Error::Remote(format!("invalid response from {endpoint}: {e}")))?;

    let root = Certificate::from_pem(&response.ca)?;
    verify_fingerprint(&root, fingerprint)?;

    debug!(subject = root.subject(), "root certificate retrieved");
    Ok(root)
}

/// Checks that `cert` hashes to `expected` (hex, case-insensitive).
///
/// # Errors
///
/// Returns [`Error::Validation`] on mismatch.
pub fn verify_fingerprint(cert: &Certificate, expected: &str) -> Result<()> {
    let actual = cert.fingerprint();
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "root fingerprint mismatch: expected {expected}, got {actual}"
        )))
    }
}
