//! Raw flag input and its validation.
//!
//! [`resolve`] applies the cross-flag rules before anything is prompted or
//! generated. A [`ValidatedConfig`] only exists if none of them failed.

use std::fs;
use std::path::{Path, PathBuf};

use ca_pki::RootAuthority;
use ca_pki::pem;
use tracing::debug;
use zeroize::Zeroizing;

use crate::cli::InitArgs;
use crate::error::InitError;

/// The flag set as supplied by the operator.
///
/// `None` means the flag was not given. An empty value is treated the same
/// way by the rules below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    /// `--root`
    pub root: Option<PathBuf>,
    /// `--key`
    pub key: Option<PathBuf>,
    /// `--pki`
    pub pki_only: bool,
    /// `--ssh`
    pub ssh: bool,
    /// `--helm`
    pub helm: bool,
    /// `--deployment-type`
    pub deployment_type: Option<String>,
    /// `--name`
    pub name: Option<String>,
    /// `--dns`
    pub dns: Option<String>,
    /// `--address`
    pub address: Option<String>,
    /// `--provisioner`
    pub provisioner: Option<String>,
    /// `--password-file`
    pub password_file: Option<PathBuf>,
    /// `--provisioner-password-file`
    pub provisioner_password_file: Option<PathBuf>,
    /// `--with-ca-url`
    pub ca_url: Option<String>,
    /// `--ra`
    pub ra: Option<String>,
    /// `--issuer`
    pub issuer: Option<String>,
    /// `--issuer-fingerprint`
    pub issuer_fingerprint: Option<String>,
    /// `--issuer-provisioner`
    pub issuer_provisioner: Option<String>,
    /// `--credentials-file`
    pub credentials_file: Option<PathBuf>,
    /// `--no-db`
    pub no_db: bool,
}

impl From<&InitArgs> for RawInput {
    fn from(args: &InitArgs) -> Self {
        Self {
            root: args.root.clone(),
            key: args.key.clone(),
            pki_only: args.pki,
            ssh: args.ssh,
            helm: args.helm,
            deployment_type: args.deployment_type.clone(),
            name: args.name.clone(),
            dns: args.dns.clone(),
            address: args.address.clone(),
            provisioner: args.provisioner.clone(),
            password_file: args.password_file.clone(),
            provisioner_password_file: args.provisioner_password_file.clone(),
            ca_url: args.with_ca_url.clone(),
            ra: args.ra.clone(),
            issuer: args.issuer.clone(),
            issuer_fingerprint: args.issuer_fingerprint.clone(),
            issuer_provisioner: args.issuer_provisioner.clone(),
            credentials_file: args.credentials_file.clone(),
            no_db: args.no_db,
        }
    }
}

/// Returns the value of a string flag unless it is unset or empty.
pub(crate) fn given(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn given_path(value: Option<&PathBuf>) -> Option<&Path> {
    value.map(PathBuf::as_path).filter(|p| !p.as_os_str().is_empty())
}

/// Registration-authority backend selected with `--ra`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaBackend {
    /// No registration authority: a local CA.
    #[default]
    Local,
    /// Delegate issuance to another step-style CA.
    StepCas,
    /// Delegate issuance to the cloud certificate authority service.
    CloudCas,
}

impl RaBackend {
    /// Parses a backend name case-insensitively; the empty name is local.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "" => Some(Self::Local),
            "stepcas" => Some(Self::StepCas),
            "cloudcas" => Some(Self::CloudCas),
            _ => None,
        }
    }

    /// Returns true for registration-authority backends.
    #[must_use]
    pub const fn is_ra(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Flags after validation, with password files read.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Operator-supplied root certificate and key.
    pub root: Option<RootAuthority>,
    /// Selected backend.
    pub backend: RaBackend,
    /// `--pki`
    pub pki_only: bool,
    /// `--no-db`
    pub no_db: bool,
    /// `--helm`
    pub helm: bool,
    /// `--ssh`
    pub ssh: bool,
    /// CA key password from `--password-file`.
    pub password: Option<Zeroizing<String>>,
    /// First-provisioner password from `--provisioner-password-file`.
    pub provisioner_password: Option<Zeroizing<String>>,
}

/// Validates the flag set.
///
/// Rules are checked in order and the first match wins: `--root` without
/// `--key`, `--key` without `--root`, reading the supplied root pair, an
/// unknown `--ra`, `--pki` with `--no-db`, and `--pki` with `--helm`. A
/// supplied root pair ends the checks, and an unknown `--ra` then means a
/// local CA. Password files are read last.
///
/// # Errors
///
/// Returns a flag error, or the error reading one of the referenced files.
pub fn resolve(raw: &RawInput) -> Result<ValidatedConfig, InitError> {
    let root = match (given_path(raw.root.as_ref()), given_path(raw.key.as_ref())) {
        (Some(_), None) => {
            return Err(InitError::RequiredWith {
                flag: "root",
                required: "key",
            });
        }
        (None, Some(_)) => {
            return Err(InitError::RequiredWith {
                flag: "key",
                required: "root",
            });
        }
        (Some(crt), Some(key)) => {
            let certificate = pem::read_certificate(crt)?;
            let key = pem::read_private_key(key)?;
            debug!(subject = certificate.subject(), "using supplied root certificate");
            Some(RootAuthority::new(certificate, key))
        }
        (None, None) => None,
    };

    let ra = raw.ra.as_deref().unwrap_or_default();
    let backend = match (&root, RaBackend::parse(ra)) {
        (_, Some(backend)) => backend,
        (Some(_), None) => {
            debug!(ra, "unknown backend with a supplied root, using a local CA");
            RaBackend::Local
        }
        (None, None) => {
            return Err(InitError::InvalidFlagValue {
                flag: "ra",
                value: ra.to_string(),
                options: "StepCAS or CloudCAS",
            });
        }
    };

    if root.is_none() {
        check_pki_only(raw)?;
    }

    let password = given_path(raw.password_file.as_ref())
        .map(read_password_file)
        .transpose()?;
    let provisioner_password = given_path(raw.provisioner_password_file.as_ref())
        .map(read_password_file)
        .transpose()?;

    Ok(ValidatedConfig {
        root,
        backend,
        pki_only: raw.pki_only,
        no_db: raw.no_db,
        helm: raw.helm,
        ssh: raw.ssh,
        password,
        provisioner_password,
    })
}

fn check_pki_only(raw: &RawInput) -> Result<(), InitError> {
    if raw.pki_only && raw.no_db {
        return Err(InitError::IncompatibleFlags {
            flag: "pki",
            other: "no-db",
        });
    }
    if raw.pki_only && raw.helm {
        return Err(InitError::IncompatibleFlags {
            flag: "pki",
            other: "helm",
        });
    }
    Ok(())
}

/// Reads a password, dropping trailing line breaks.
fn read_password_file(path: &Path) -> Result<Zeroizing<String>, InitError> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| InitError::FileRead {
        path: path.to_path_buf(),
        source,
    })?);
    Ok(Zeroizing::new(contents.trim_end_matches(['\r', '\n']).to_string()))
}
