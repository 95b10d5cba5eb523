//! Backend options and PKI construction options.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How provisioners and admins of the new authority are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    /// Keys, provisioners and admins all live with the local authority.
    #[default]
    Standalone,
    /// Keys are local; provisioners and admins are managed externally.
    Linked,
    /// Everything is managed externally.
    Hosted,
}

impl DeploymentType {
    /// Returns the lower-case name used on the command line and in config.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Linked => "linked",
            Self::Hosted => "hosted",
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity used by a registration authority to request certificates
/// from its upstream authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateIssuer {
    /// Provisioner type, e.g. `JWK`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Provisioner name in the upstream authority.
    pub provisioner: String,
}

/// Parameters for the cloud-hosted certificate authority service backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudCasOptions {
    /// Service-account credentials file.
    pub credentials_file: Option<PathBuf>,
    /// Fully-qualified authority resource; empty when creating a new one.
    pub certificate_authority: String,
    /// Whether this run creates the authority.
    pub is_creator: bool,
    /// Cloud project id.
    pub project: String,
    /// Region or location.
    pub location: String,
    /// CA pool name.
    pub ca_pool: String,
    /// CA pool tier (`DEVOPS` or `ENTERPRISE`).
    pub ca_pool_tier: String,
    /// Storage bucket; empty selects a managed one.
    pub gcs_bucket: String,
}

/// Parameters for a registration authority fronting another step-style CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCasOptions {
    /// HTTPS URL of the upstream authority.
    pub certificate_authority: String,
    /// SHA-256 fingerprint of the upstream root certificate.
    pub fingerprint: String,
    /// Identity used to request certificates upstream.
    pub issuer: CertificateIssuer,
}

/// Backend the new authority issues certificates through.
///
/// Exactly one variant is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOptions {
    /// Local signing with locally generated keys.
    Soft,
    /// Cloud-hosted certificate authority service.
    CloudCas(CloudCasOptions),
    /// Registration authority delegating to another CA.
    StepCas(StepCasOptions),
}

impl CasOptions {
    /// Returns true when this run creates root and intermediate certificates.
    #[must_use]
    pub const fn is_creator(&self) -> bool {
        match self {
            Self::Soft => true,
            Self::CloudCas(options) => options.is_creator,
            Self::StepCas(_) => false,
        }
    }

    /// Returns the backend name written to the authority configuration.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Soft => "softcas",
            Self::CloudCas(_) => "cloudcas",
            Self::StepCas(_) => "stepcas",
        }
    }
}

/// One configuration choice applied when constructing the PKI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PkiOption {
    /// Generate key material only; write no authority configuration.
    PkiOnly,
    /// Listen address of the authority.
    Address(String),
    /// Authority URL written to the client defaults.
    CaUrl(String),
    /// DNS names or IP addresses of the authority.
    DnsNames(Vec<String>),
    /// Deployment topology.
    DeploymentType(DeploymentType),
    /// Name of the first provisioner.
    Provisioner(String),
    /// Enable remote administration.
    Admin,
    /// Enable SSH certificate signing.
    Ssh,
    /// Omit the database stanza.
    NoDb,
    /// Render a Helm values template instead of writing configuration.
    Helm,
}

/// Settings folded from a list of [`PkiOption`]s; later options win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// See [`PkiOption::PkiOnly`].
    pub pki_only: bool,
    /// See [`PkiOption::Address`].
    pub address: String,
    /// See [`PkiOption::CaUrl`].
    pub ca_url: String,
    /// See [`PkiOption::DnsNames`].
    pub dns_names: Vec<String>,
    /// See [`PkiOption::DeploymentType`].
    pub deployment_type: DeploymentType,
    /// See [`PkiOption::Provisioner`].
    pub provisioner: Option<String>,
    /// See [`PkiOption::Admin`].
    pub admin: bool,
    /// See [`PkiOption::Ssh`].
    pub ssh: bool,
    /// See [`PkiOption::NoDb`].
    pub no_db: bool,
    /// See [`PkiOption::Helm`].
    pub helm: bool,
}

impl Settings {
    /// Folds construction options into settings.
    #[must_use]
    pub fn from_options(options: Vec<PkiOption>) -> Self {
        let mut settings = Self::default();
        for option in options {
            match option {
                PkiOption::PkiOnly => settings.pki_only = true,
                PkiOption::Address(address) => settings.address = address,
                PkiOption::CaUrl(url) => settings.ca_url = url,
                PkiOption::DnsNames(names) => settings.dns_names = names,
                PkiOption::DeploymentType(kind) => settings.deployment_type = kind,
                PkiOption::Provisioner(name) => settings.provisioner = Some(name),
                PkiOption::Admin => settings.admin = true,
                PkiOption::Ssh => settings.ssh = true,
                PkiOption::NoDb => settings.no_db = true,
                PkiOption::Helm => settings.helm = true,
            }
        }
        settings
    }
}
