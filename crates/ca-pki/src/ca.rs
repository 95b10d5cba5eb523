//! Root and intermediate certificate generation.

use chrono::{DateTime, Duration, Utc};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Certificate, PrivateKey, RootAuthority};

/// Validity of root and intermediate certificates (10 years).
const CA_VALIDITY_DAYS: i64 = 3650;

/// Generates a self-signed root certificate authority.
///
/// The subject common name is `"<name> Root CA"`.
///
/// # Errors
///
/// Returns an error if key or certificate generation fails.
pub fn generate_root(name: &str, organization: &str) -> Result<RootAuthority> {
    let common_name = format!("{name} Root CA");
    info!("Creating root certificate: {}", common_name);

    let key_pair = KeyPair::generate()
        .map_err(|e| Error::Generation(format!("failed to generate key pair: {e}")))?;

    let params = ca_params(&common_name, organization, BasicConstraints::Constrained(1))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| Error::Generation(format!("failed to generate root certificate: {e}")))?;

    let certificate = Certificate::from_der(cert.der())?;
    let key = PrivateKey::new(key_pair.serialize_der());

    debug!("root certificate created");
    Ok(RootAuthority::new(certificate, key))
}

/// Generates an intermediate certificate authority signed by `root`.
///
/// The subject common name is `"<name> Intermediate CA"` and the path
/// length is constrained to zero.
///
/// # Errors
///
/// Returns an error if the root key cannot be loaded or signing fails.
pub fn generate_intermediate(
    root: &RootAuthority,
    name: &str,
    organization: &str,
) -> Result<(Certificate, PrivateKey)> {
    let common_name = format!("{name} Intermediate CA");
    info!("Creating intermediate certificate: {}", common_name);

    let root_key = KeyPair::try_from(root.key().der())
        .map_err(|e| Error::Parse(format!("failed to parse root private key: {e}")))?;
    let issuer = issuer_cert(root.certificate(), &root_key)?;

    let key_pair = KeyPair::generate()
        .map_err(|e| Error::Generation(format!("failed to generate key pair: {e}")))?;

    let params = ca_params(&common_name, organization, BasicConstraints::Constrained(0))?;
    let cert = params
        .signed_by(&key_pair, &issuer, &root_key)
        .map_err(|e| Error::Generation(format!("failed to sign intermediate certificate: {e}")))?;

    let certificate = Certificate::from_der(cert.der())?;
    let key = PrivateKey::new(key_pair.serialize_der());

    debug!("intermediate certificate created");
    Ok((certificate, key))
}

fn ca_params(
    common_name: &str,
    organization: &str,
    constraints: BasicConstraints,
) -> Result<CertificateParams> {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, common_name);
    if !organization.is_empty() {
        params
            .distinguished_name
            .push(DnType::OrganizationName, organization);
    }
    params.is_ca = IsCa::Ca(constraints);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];

    let now = Utc::now();
    params.not_before = to_rcgen_time(now - Duration::hours(1))?; // clock skew
    params.not_after = to_rcgen_time(now + Duration::days(CA_VALIDITY_DAYS))?;
    Ok(params)
}

/// Rebuilds an rcgen issuer from an existing root so it can sign.
///
/// The distinguished name and key come from the real root, which is all
/// the issued certificate refers to.
fn issuer_cert(root: &Certificate, key: &KeyPair) -> Result<rcgen::Certificate> {
    let params = CertificateParams::from_ca_cert_pem(&root.pem())
        .map_err(|e| Error::Parse(format!("failed to load root certificate: {e}")))?;
    params
        .self_signed(key)
        .map_err(|e| Error::Generation(format!("failed to create issuer cert: {e}")))
}

/// Converts a chrono `DateTime` to rcgen `OffsetDateTime`.
fn to_rcgen_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| Error::Generation(format!("invalid timestamp: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_certificate;

    #[test]
    fn root_is_self_signed_ca() {
        let root = generate_root("Acme", "Acme Inc").unwrap();
        let cert = root.certificate();
        assert_eq!(cert.subject(), "Acme Root CA");
        assert_eq!(cert.issuer(), "Acme Root CA");
        assert!(cert.is_ca());
    }

    #[test]
    fn root_validity_spans_ten_years() {
        let root = generate_root("Acme", "Acme Inc").unwrap();
        let now = Utc::now();
        let cert = root.certificate();
        assert!(cert.not_before() < now);
        assert!((cert.not_after() - (now + Duration::days(CA_VALIDITY_DAYS))).num_hours().abs() < 2);
    }

    #[test]
    fn intermediate_is_signed_by_root() {
        let root = generate_root("Acme", "Acme Inc").unwrap();
        let (intermediate, key) = generate_intermediate(&root, "Acme", "Acme Inc").unwrap();

        assert_eq!(intermediate.subject(), "Acme Intermediate CA");
        assert_eq!(intermediate.issuer(), "Acme Root CA");
        assert!(intermediate.is_ca());
        assert!(!key.der().is_empty());
        validate_certificate(&intermediate, root.certificate()).unwrap();
    }

    #[test]
    fn intermediate_from_imported_root() {
        let generated = generate_root("Imported", "").unwrap();
        let cert = Certificate::from_pem(&generated.certificate().pem()).unwrap();
        let imported = RootAuthority::new(cert, generated.key().clone());

        let (intermediate, _) = generate_intermediate(&imported, "Imported", "").unwrap();
        validate_certificate(&intermediate, imported.certificate()).unwrap();
    }

    #[test]
    fn intermediate_with_bad_root_key_fails() {
        let root = generate_root("Acme", "").unwrap();
        let broken = RootAuthority::new(root.certificate().clone(), PrivateKey::new(vec![0; 8]));
        let result = generate_intermediate(&broken, "Acme", "");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
