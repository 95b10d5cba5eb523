//! The PKI object driven by the bootstrap sequence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};

use crate::ca;
use crate::config::{AuthorityConfig, CaConfig, DbConfig, Defaults, LoggerConfig, SshConfig, TlsConfig};
use crate::error::{Error, Result};
use crate::keys::{self, ProvisionerKey, SshKeyPair};
use crate::options::{CasOptions, DeploymentType, PkiOption, Settings};
use crate::paths::{HELM_BASE, PkiPaths};
use crate::remote;
use crate::types::{Certificate, RootAuthority};
use crate::validation::{validate_certificate, validate_root};

/// Every side-effecting call the bootstrap sequence makes.
///
/// Calls are made in dependency order; an implementation may assume the
/// root exists before [`Pki::generate_intermediate_certificate`] and that
/// [`Pki::save`] and [`Pki::write_helm_template`] come last.
pub trait Pki {
    /// Generates the first provisioner's key pair sealed with `password`.
    fn generate_key_pairs(&mut self, password: &[u8]) -> Result<()>;

    /// Generates and writes a new root certificate and sealed key.
    fn generate_root_certificate(
        &mut self,
        name: &str,
        organization: &str,
        resource: &str,
        password: &[u8],
    ) -> Result<RootAuthority>;

    /// Writes an operator-supplied root certificate. Its key is never written.
    fn write_root_certificate(&mut self, root: &Certificate) -> Result<()>;

    /// Generates and writes the intermediate certificate signed by `root`.
    fn generate_intermediate_certificate(
        &mut self,
        name: &str,
        organization: &str,
        resource: &str,
        root: &RootAuthority,
        password: &[u8],
    ) -> Result<()>;

    /// Retrieves the upstream authority's root certificate.
    fn get_certificate_authority(&mut self) -> Result<()>;

    /// Generates user and host SSH certificate-signing keys.
    fn generate_ssh_signing_keys(&mut self, password: &[u8]) -> Result<()>;

    /// Renders Helm chart values to `out` instead of writing configuration.
    fn write_helm_template(&self, out: &mut dyn Write) -> Result<()>;

    /// Persists the configuration tree and reports what was written.
    fn save(&self) -> Result<SaveSummary>;
}

/// Labelled locations and values reported after [`Pki::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    entries: Vec<(String, String)>,
}

impl SaveSummary {
    fn push(&mut self, label: &str, value: impl ToString) {
        self.entries.push((label.to_string(), value.to_string()));
    }

    /// Returns `(label, value)` pairs in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// PKI that writes into a directory tree (`$STEPPATH` by default).
///
/// In helm mode nothing is written; generated material is kept in memory
/// and rendered by [`Pki::write_helm_template`].
#[derive(Debug)]
pub struct FilePki {
    cas: CasOptions,
    settings: Settings,
    paths: PkiPaths,
    root: Option<Certificate>,
    root_key: Option<String>,
    intermediate: Option<Certificate>,
    intermediate_key: Option<String>,
    provisioner: Option<ProvisionerKey>,
    ssh_host: Option<SshKeyPair>,
    ssh_user: Option<SshKeyPair>,
}

impl FilePki {
    /// Creates a PKI rooted at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be resolved or the options
    /// are inconsistent.
    pub fn new(cas: CasOptions, options: Vec<PkiOption>) -> Result<Self> {
        Self::with_paths(PkiPaths::from_env()?, cas, options)
    }

    /// Creates a PKI rooted at `paths`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unsupported or the options are
    /// inconsistent.
    pub fn with_paths(paths: PkiPaths, cas: CasOptions, options: Vec<PkiOption>) -> Result<Self> {
        let settings = Settings::from_options(options);

        if let CasOptions::CloudCas(_) = cas {
            return Err(Error::Unsupported(
                "the cloudcas backend needs a certificate authority service client, which this build does not include".into(),
            ));
        }
        if settings.deployment_type == DeploymentType::Hosted {
            return Err(Error::Unsupported("hosted deployments cannot be initialized locally".into()));
        }
        if settings.pki_only && settings.helm {
            return Err(Error::Validation("pki-only output cannot be rendered as a helm template".into()));
        }
        if !settings.pki_only {
            if settings.dns_names.is_empty() {
                return Err(Error::Validation("at least one DNS name or IP address is required".into()));
            }
            parse_port(&settings.address)?;
        }

        info!(
            base = %paths.base().display(),
            backend = cas.type_name(),
            deployment = %settings.deployment_type,
            "initializing PKI"
        );

        Ok(Self {
            cas,
            settings,
            paths,
            root: None,
            root_key: None,
            intermediate: None,
            intermediate_key: None,
            provisioner: None,
            ssh_host: None,
            ssh_user: None,
        })
    }

    /// Returns the output locations.
    #[must_use]
    pub const fn paths(&self) -> &PkiPaths {
        &self.paths
    }

    /// Returns the folded construction settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    fn write(&self, path: &Path, contents: &[u8], secret: bool) -> Result<()> {
        if self.settings.helm {
            return Ok(());
        }
        write_file(path, contents, secret)
    }

    fn ca_url(&self) -> String {
        if !self.settings.ca_url.is_empty() {
            return self.settings.ca_url.clone();
        }
        let host = self
            .settings
            .dns_names
            .first()
            .map_or("localhost", String::as_str);
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        match parse_port(&self.settings.address) {
            Ok(443) | Err(_) => format!("https://{host}"),
            Ok(port) => format!("https://{host}:{port}"),
        }
    }

    fn ca_config(&self, paths: &PkiPaths) -> CaConfig {
        let creates = self.cas.is_creator();
        CaConfig {
            root: paths.root_crt(),
            crt: creates.then(|| paths.intermediate_crt()),
            key: creates.then(|| paths.intermediate_key()),
            address: self.settings.address.clone(),
            dns_names: self.settings.dns_names.clone(),
            // Linked deployments keep SSH keys out of ca.json.
            ssh: (self.settings.ssh && self.ssh_host.is_some() && self.ssh_user.is_some())
                .then(|| SshConfig {
                    host_key: paths.ssh_host_key(),
                    user_key: paths.ssh_user_key(),
                }),
            logger: LoggerConfig::default(),
            db: (!self.settings.no_db).then(|| DbConfig {
                kind: "badgerv2".into(),
                data_source: paths.db(),
            }),
            authority: AuthorityConfig::new(&self.cas, &self.settings, self.provisioner.as_ref()),
            tls: TlsConfig::default(),
        }
    }

    fn defaults(&self, paths: &PkiPaths, root: &Certificate) -> Defaults {
        Defaults {
            ca_url: self.ca_url(),
            ca_config: paths.ca_config(),
            fingerprint: root.fingerprint(),
            root: paths.root_crt(),
        }
    }

    fn require_root(&self) -> Result<&Certificate> {
        self.root
            .as_ref()
            .ok_or_else(|| Error::Validation("root certificate has not been created".into()))
    }
}

impl Pki for FilePki {
    fn generate_key_pairs(&mut self, password: &[u8]) -> Result<()> {
        let name = self
            .settings
            .provisioner
            .as_deref()
            .ok_or_else(|| Error::Validation("a provisioner name is required".into()))?;
        info!("Generating key pair for provisioner {}", name);
        self.provisioner = Some(keys::generate_provisioner(name, password)?);
        Ok(())
    }

    fn generate_root_certificate(
        &mut self,
        name: &str,
        organization: &str,
        resource: &str,
        password: &[u8],
    ) -> Result<RootAuthority> {
        if !resource.is_empty() {
            debug!(resource, "resource id only applies to remote backends");
        }
        let root = ca::generate_root(name, organization)?;
        let sealed = keys::seal_pem(password, root.key().der())?;

        self.write(&self.paths.root_crt(), root.certificate().pem().as_bytes(), false)?;
        self.write(&self.paths.root_key(), sealed.as_bytes(), true)?;

        self.root = Some(root.certificate().clone());
        self.root_key = Some(sealed);
        Ok(root)
    }

    fn write_root_certificate(&mut self, root: &Certificate) -> Result<()> {
        validate_root(root)?;
        self.write(&self.paths.root_crt(), root.pem().as_bytes(), false)?;
        self.root = Some(root.clone());
        Ok(())
    }

    fn generate_intermediate_certificate(
        &mut self,
        name: &str,
        organization: &str,
        _resource: &str,
        root: &RootAuthority,
        password: &[u8],
    ) -> Result<()> {
        let (certificate, key) = ca::generate_intermediate(root, name, organization)?;
        validate_certificate(&certificate, root.certificate())?;
        let sealed = keys::seal_pem(password, key.der())?;

        self.write(&self.paths.intermediate_crt(), certificate.pem().as_bytes(), false)?;
        self.write(&self.paths.intermediate_key(), sealed.as_bytes(), true)?;

        self.intermediate = Some(certificate);
        self.intermediate_key = Some(sealed);
        Ok(())
    }

    fn get_certificate_authority(&mut self) -> Result<()> {
        let CasOptions::StepCas(options) = &self.cas else {
            return Err(Error::Unsupported(format!(
                "{} does not retrieve a remote authority",
                self.cas.type_name()
            )));
        };
        let root = remote::fetch_root(&options.certificate_authority, &options.fingerprint)?;
        self.write(&self.paths.root_crt(), root.pem().as_bytes(), false)?;
        self.root = Some(root);
        Ok(())
    }

    fn generate_ssh_signing_keys(&mut self, password: &[u8]) -> Result<()> {
        let host = keys::generate_ssh_key(password)?;
        let user = keys::generate_ssh_key(password)?;

        self.write(&self.paths.ssh_host_pub(), host.public.as_bytes(), false)?;
        self.write(&self.paths.ssh_host_key(), host.private_pem.as_bytes(), true)?;
        self.write(&self.paths.ssh_user_pub(), user.public.as_bytes(), false)?;
        self.write(&self.paths.ssh_user_key(), user.private_pem.as_bytes(), true)?;

        self.ssh_host = Some(host);
        self.ssh_user = Some(user);
        Ok(())
    }

    fn write_helm_template(&self, out: &mut dyn Write) -> Result<()> {
        let root = self.require_root()?;
        let paths = PkiPaths::new(HELM_BASE);

        let values = json!({
            "inject": {
                "enabled": true,
                "config": {
                    "files": {
                        "ca.json": self.ca_config(&paths),
                        "defaults.json": self.defaults(&paths, root),
                    }
                },
                "certificates": {
                    "root_ca": root.pem(),
                    "intermediate_ca": self.intermediate.as_ref().map(Certificate::pem),
                    "ssh_host_ca": self.ssh_host.as_ref().map(|k| k.public.clone()),
                    "ssh_user_ca": self.ssh_user.as_ref().map(|k| k.public.clone()),
                },
                "secrets": {
                    "x509": {
                        "root_ca_key": self.root_key,
                        "intermediate_ca_key": self.intermediate_key,
                    },
                    "ssh": {
                        "host_ca_key": self.ssh_host.as_ref().map(|k| k.private_pem.clone()),
                        "user_ca_key": self.ssh_user.as_ref().map(|k| k.private_pem.clone()),
                    }
                }
            }
        });

        // JSON is valid YAML, which is what helm reads values from.
        serde_json::to_writer_pretty(&mut *out, &values)
            .map_err(|e| Error::Serialization(format!("failed to render helm values: {e}")))?;
        writeln!(out).map_err(|source| Error::Write {
            path: PathBuf::from("<helm template>"),
            source,
        })
    }

    fn save(&self) -> Result<SaveSummary> {
        if self.settings.helm {
            return Err(Error::Validation("helm mode renders a template instead of saving".into()));
        }
        let root = self.require_root()?;
        let mut summary = SaveSummary::default();

        summary.push("Root certificate", self.paths.root_crt().display());
        if self.root_key.is_some() {
            summary.push("Root private key", self.paths.root_key().display());
        }
        summary.push("Root fingerprint", root.fingerprint());
        if self.intermediate.is_some() {
            summary.push("Intermediate certificate", self.paths.intermediate_crt().display());
            summary.push("Intermediate private key", self.paths.intermediate_key().display());
        }
        if self.ssh_host.is_some() {
            summary.push("SSH user public key", self.paths.ssh_user_pub().display());
            summary.push("SSH host public key", self.paths.ssh_host_pub().display());
        }

        if self.settings.pki_only {
            return Ok(summary);
        }

        let config = self.ca_config(&self.paths);
        write_json(&self.paths.ca_config(), &config)?;
        write_json(&self.paths.defaults(), &self.defaults(&self.paths, root))?;
        if let Some(db) = &config.db {
            fs::create_dir_all(&db.data_source).map_err(|source| Error::Write {
                path: db.data_source.clone(),
                source,
            })?;
        }

        summary.push("Database folder", if self.settings.no_db {
            "disabled".to_string()
        } else {
            self.paths.db().display().to_string()
        });
        summary.push("Default configuration", self.paths.defaults().display());
        summary.push("Certificate Authority configuration", self.paths.ca_config().display());

        info!("PKI configuration saved to {}", self.paths.base().display());
        Ok(summary)
    }
}

fn parse_port(address: &str) -> Result<u16> {
    let (_, port) = address
        .rsplit_once(':')
        .ok_or_else(|| Error::Validation(format!("address '{address}' is missing a port")))?;
    port.parse()
        .map_err(|_| Error::Validation(format!("address '{address}' has an invalid port")))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Serialization(format!("{}: {e}", path.display())))?;
    bytes.push(b'\n');
    write_file(path, &bytes, false)
}

fn write_file(path: &Path, contents: &[u8], secret: bool) -> Result<()> {
    let to_write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(if secret { 0o600 } else { 0o644 });
    }
    #[cfg(not(unix))]
    let _ = secret;

    let mut file = options.open(path).map_err(to_write_error)?;
    file.write_all(contents).map_err(to_write_error)?;
    debug!(path = %path.display(), "wrote file");
    Ok(())
}
