//! Certificate validation used before key material is written.

use chrono::Utc;
use tracing::debug;
use x509_parser::prelude::*;

use crate::error::{Error, Result};
use crate::types::Certificate;

/// Validates a certificate against its issuing CA certificate.
///
/// Checks the validity window, that the issuer matches the CA subject and
/// that the signature verifies with the CA public key.
///
/// # Errors
///
/// Returns an error if validation fails.
pub fn validate_certificate(cert: &Certificate, ca_cert: &Certificate) -> Result<()> {
    debug!("Validating certificate: {}", cert.subject());

    check_validity_window(cert)?;

    if cert.issuer() != ca_cert.subject() {
        return Err(Error::Validation(format!(
            "issuer '{}' does not match CA subject '{}'",
            cert.issuer(),
            ca_cert.subject()
        )));
    }

    verify_signature(cert, ca_cert)
}

/// Validates a certificate offered as a root authority.
///
/// The certificate must be a currently valid CA certificate.
///
/// # Errors
///
/// Returns an error if the certificate cannot act as a root.
pub fn validate_root(cert: &Certificate) -> Result<()> {
    check_validity_window(cert)?;
    if !cert.is_ca() {
        return Err(Error::Validation(format!(
            "'{}' is not a CA certificate",
            cert.subject()
        )));
    }
    Ok(())
}

/// Checks if a certificate is expired.
#[must_use]
pub fn is_expired(cert: &Certificate) -> bool {
    cert.not_after() < Utc::now()
}

/// Checks if a certificate is not yet valid.
#[must_use]
pub fn is_not_yet_valid(cert: &Certificate) -> bool {
    cert.not_before() > Utc::now()
}

fn check_validity_window(cert: &Certificate) -> Result<()> {
    if is_expired(cert) {
        return Err(Error::Validation(format!("'{}' has expired", cert.subject())));
    }
    if is_not_yet_valid(cert) {
        return Err(Error::Validation(format!("'{}' is not yet valid", cert.subject())));
    }
    Ok(())
}

/// Verifies that a certificate was signed by the given issuer.
fn verify_signature(cert: &Certificate, issuer: &Certificate) -> Result<()> {
    let (_, parsed_cert) = X509Certificate::from_der(cert.der())
        .map_err(|e| Error::Parse(format!("failed to parse certificate: {e}")))?;

    let (_, parsed_issuer) = X509Certificate::from_der(issuer.der())
        .map_err(|e| Error::Parse(format!("failed to parse issuer certificate: {e}")))?;

    parsed_cert
        .verify_signature(Some(parsed_issuer.public_key()))
        .map_err(|e| {
            Error::SignatureVerification(format!(
                "signature verification failed for '{}': {e:?}",
                cert.subject()
            ))
        })
}
