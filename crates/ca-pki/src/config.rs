//! Serialized authority configuration (`ca.json`) and client defaults.

use std::path::PathBuf;

use serde::Serialize;

use crate::keys::{Jwk, ProvisionerKey};
use crate::options::{CasOptions, CertificateIssuer, DeploymentType, Settings};

/// Contents of `ca.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaConfig {
    /// Root certificate path.
    pub root: PathBuf,
    /// Intermediate certificate path; absent for registration authorities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crt: Option<PathBuf>,
    /// Intermediate key path; absent for registration authorities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    /// Listen address.
    pub address: String,
    /// Names the authority serves TLS for.
    pub dns_names: Vec<String>,
    /// SSH signing keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshConfig>,
    /// Log output settings.
    pub logger: LoggerConfig,
    /// Persistence layer; absent with no-db.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<DbConfig>,
    /// Issuance settings.
    pub authority: AuthorityConfig,
    /// TLS server settings.
    pub tls: TlsConfig,
}

/// SSH signing key locations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    /// Host CA key.
    pub host_key: PathBuf,
    /// User CA key.
    pub user_key: PathBuf,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize)]
pub struct LoggerConfig {
    /// Log format.
    pub format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: "text".into(),
        }
    }
}

/// Persistence layer settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    /// Database driver.
    #[serde(rename = "type")]
    pub kind: String,
    /// Database location.
    pub data_source: PathBuf,
}

/// TLS server settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Minimum protocol version.
    pub min_version: f32,
    /// Maximum protocol version.
    pub max_version: f32,
    /// TLS renegotiation.
    pub renegotiation: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: 1.2,
            max_version: 1.3,
            renegotiation: false,
        }
    }
}

/// A configured provisioner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerConfig {
    /// Provisioner type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Provisioner name.
    pub name: String,
    /// Public key.
    pub key: Jwk,
    /// Sealed private key.
    pub encrypted_key: String,
}

impl From<&ProvisionerKey> for ProvisionerConfig {
    fn from(key: &ProvisionerKey) -> Self {
        Self {
            kind: "JWK".into(),
            name: key.name.clone(),
            key: key.jwk.clone(),
            encrypted_key: key.encrypted_key.clone(),
        }
    }
}

/// Issuance settings, including the registration-authority backend.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityConfig {
    /// Backend type; absent for local signing.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub cas_type: Option<String>,
    /// Upstream authority URL or resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    /// Upstream root fingerprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_fingerprint: Option<String>,
    /// Upstream issuing identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_issuer: Option<CertificateIssuer>,
    /// Cloud credentials file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
    /// Non-standalone deployment type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<DeploymentType>,
    /// Remote administration.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enable_admin: bool,
    /// Configured provisioners.
    pub provisioners: Vec<ProvisionerConfig>,
}

impl AuthorityConfig {
    /// Builds the authority stanza for a backend and its settings.
    #[must_use]
    pub fn new(cas: &CasOptions, settings: &Settings, provisioner: Option<&ProvisionerKey>) -> Self {
        let mut config = Self {
            deployment_type: (settings.deployment_type != DeploymentType::Standalone)
                .then_some(settings.deployment_type),
            enable_admin: settings.admin,
            provisioners: provisioner.map(ProvisionerConfig::from).into_iter().collect(),
            ..Self::default()
        };
        match cas {
            CasOptions::Soft => {}
            CasOptions::CloudCas(options) => {
                config.cas_type = Some("cloudCAS".into());
                config.certificate_authority = Some(options.certificate_authority.clone())
                    .filter(|ca| !ca.is_empty());
                config.credentials_file.clone_from(&options.credentials_file);
            }
            CasOptions::StepCas(options) => {
                config.cas_type = Some("stepcas".into());
                config.certificate_authority = Some(options.certificate_authority.clone());
                config.certificate_authority_fingerprint = Some(options.fingerprint.clone());
                config.certificate_issuer = Some(options.issuer.clone());
            }
        }
        config
    }
}

/// Contents of `defaults.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Defaults {
    /// Authority URL.
    #[serde(rename = "ca-url")]
    pub ca_url: String,
    /// Authority configuration path.
    #[serde(rename = "ca-config")]
    pub ca_config: PathBuf,
    /// Root fingerprint.
    pub fingerprint: String,
    /// Root certificate path.
    pub root: PathBuf,
}
