//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser};

/// Initialize the PKI of a new certificate authority or registration authority.
#[derive(Parser, Debug, Clone)]
#[command(name = "ca-init")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Initialization flags.
    #[command(flatten)]
    pub init: InitArgs,
}

/// Flags accepted by the initialization flow.
#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// The path of an existing PEM file to be used as the root certificate
    /// authority.
    #[arg(long, value_name = "FILE")]
    pub root: Option<PathBuf>,

    /// The path of an existing key file of the root certificate authority.
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// Generate only the PKI without the CA configuration.
    #[arg(long)]
    pub pki: bool,

    /// Create keys to sign SSH certificates.
    #[arg(long)]
    pub ssh: bool,

    /// Generate a Helm values YAML to be used with the step-certificates chart.
    #[arg(long)]
    pub helm: bool,

    /// The deployment type: standalone, linked or hosted.
    #[arg(long, value_name = "NAME")]
    pub deployment_type: Option<String>,

    /// The name of the new PKI.
    #[arg(long)]
    pub name: Option<String>,

    /// The comma separated DNS names or IP addresses of the new CA.
    #[arg(long, value_name = "NAMES")]
    pub dns: Option<String>,

    /// The address that the new CA will listen at.
    #[arg(long)]
    pub address: Option<String>,

    /// The name of the first provisioner.
    #[arg(long, value_name = "NAME")]
    pub provisioner: Option<String>,

    /// The path to the file containing the password to encrypt the keys.
    #[arg(long, value_name = "FILE")]
    pub password_file: Option<PathBuf>,

    /// The path to the file containing the password to encrypt the
    /// provisioner key.
    #[arg(long, value_name = "FILE")]
    pub provisioner_password_file: Option<PathBuf>,

    /// URI of the certificate authority to write in defaults.json.
    #[arg(long, value_name = "URI")]
    pub with_ca_url: Option<String>,

    /// The registration authority to use: StepCAS or CloudCAS.
    #[arg(long, value_name = "NAME")]
    pub ra: Option<String>,

    /// The registration authority issuer.
    ///
    /// With StepCAS this is the URL of the upstream CA. With CloudCAS this is
    /// the resource name of the intermediate certificate authority, in the
    /// form `projects/*/locations/*/caPools/*/certificateAuthorities/*`.
    #[arg(long, value_name = "URL")]
    pub issuer: Option<String>,

    /// The root certificate fingerprint of the issuer CA (StepCAS).
    #[arg(long, value_name = "FINGERPRINT")]
    pub issuer_fingerprint: Option<String>,

    /// The name of an existing provisioner in the issuer CA (StepCAS).
    #[arg(long, value_name = "NAME")]
    pub issuer_provisioner: Option<String>,

    /// The registration authority credentials file (CloudCAS service account key).
    #[arg(long, value_name = "FILE", env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    /// Generate a CA configuration without the DB stanza. No persistence layer.
    #[arg(long)]
    pub no_db: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flag_surface() {
        let cli = Cli::try_parse_from([
            "ca-init",
            "--deployment-type",
            "Linked",
            "--dns",
            "ca.example.com,1.1.1.1",
            "--address",
            ":443",
            "--ra",
            "StepCAS",
            "--issuer-fingerprint",
            "abc",
            "--with-ca-url",
            "https://ca.example.com",
            "--pki",
            "--no-db",
        ])
        .unwrap();
        assert_eq!(cli.init.deployment_type.as_deref(), Some("Linked"));
        assert_eq!(cli.init.dns.as_deref(), Some("ca.example.com,1.1.1.1"));
        assert_eq!(cli.init.ra.as_deref(), Some("StepCAS"));
        assert_eq!(cli.init.with_ca_url.as_deref(), Some("https://ca.example.com"));
        assert!(cli.init.pki);
        assert!(cli.init.no_db);
        assert!(!cli.init.helm);
    }

    #[test]
    fn root_and_key_are_paths() {
        let cli = Cli::try_parse_from(["ca-init", "--root", "root.crt", "--key", "root.key"]).unwrap();
        assert_eq!(cli.init.root, Some(PathBuf::from("root.crt")));
        assert_eq!(cli.init.key, Some(PathBuf::from("root.key")));
    }
}
