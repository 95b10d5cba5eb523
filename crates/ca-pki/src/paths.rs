//! Output locations of the PKI tree.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the PKI root directory.
pub const STEPPATH_ENV: &str = "STEPPATH";

/// Base directory used in rendered Helm values.
pub const HELM_BASE: &str = "/home/step";

/// Locations of every file the PKI tree may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkiPaths {
    base: PathBuf,
}

impl PkiPaths {
    /// Creates paths rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolves the base from `$STEPPATH`, falling back to `$HOME/.step`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn from_env() -> Result<Self> {
        if let Some(path) = std::env::var_os(STEPPATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(Self::new(path));
        }
        dirs::home_dir()
            .map(|home| Self::new(home.join(".step")))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "cannot determine home directory; set {STEPPATH_ENV}"
                ))
            })
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Root certificate.
    #[must_use]
    pub fn root_crt(&self) -> PathBuf {
        self.base.join("certs").join("root_ca.crt")
    }

    /// Sealed root key.
    #[must_use]
    pub fn root_key(&self) -> PathBuf {
        self.base.join("secrets").join("root_ca_key")
    }

    /// Intermediate certificate.
    #[must_use]
    pub fn intermediate_crt(&self) -> PathBuf {
        self.base.join("certs").join("intermediate_ca.crt")
    }

    /// Sealed intermediate key.
    #[must_use]
    pub fn intermediate_key(&self) -> PathBuf {
        self.base.join("secrets").join("intermediate_ca_key")
    }

    /// SSH host CA public key.
    #[must_use]
    pub fn ssh_host_pub(&self) -> PathBuf {
        self.base.join("certs").join("ssh_host_ca_key.pub")
    }

    /// Sealed SSH host CA key.
    #[must_use]
    pub fn ssh_host_key(&self) -> PathBuf {
        self.base.join("secrets").join("ssh_host_ca_key")
    }

    /// SSH user CA public key.
    #[must_use]
    pub fn ssh_user_pub(&self) -> PathBuf {
        self.base.join("certs").join("ssh_user_ca_key.pub")
    }

    /// Sealed SSH user CA key.
    #[must_use]
    pub fn ssh_user_key(&self) -> PathBuf {
        self.base.join("secrets").join("ssh_user_ca_key")
    }

    /// Authority configuration.
    #[must_use]
    pub fn ca_config(&self) -> PathBuf {
        self.base.join("config").join("ca.json")
    }

    /// Client defaults.
    #[must_use]
    pub fn defaults(&self) -> PathBuf {
        self.base.join("config").join("defaults.json")
    }

    /// Database directory.
    #[must_use]
    pub fn db(&self) -> PathBuf {
        self.base.join("db")
    }
}
