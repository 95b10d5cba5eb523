//! Collection of the PKI construction options.

use ca_pki::{DeploymentType, PkiOption};
use tracing::debug;

use crate::error::InitError;
use crate::input::{RawInput, ValidatedConfig, given};
use crate::prompt::{Prompter, flag_or_ask};
use crate::validators;

/// Splits DNS names and IP addresses separated by commas or spaces.
///
/// Empty segments are dropped and order is preserved.
#[must_use]
pub fn normalize_dns_names(input: &str) -> Vec<String> {
    input
        .replace(' ', ",")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Gathers the options the PKI is constructed with.
///
/// PKI-only runs need nothing beyond [`PkiOption::PkiOnly`]. Otherwise the
/// DNS names, bind address and, for standalone deployments, the first
/// provisioner are taken from flags or asked for.
///
/// # Errors
///
/// Returns an error if a prompt fails.
pub fn collect_options(
    prompter: &mut dyn Prompter,
    raw: &RawInput,
    config: &ValidatedConfig,
    deployment: DeploymentType,
) -> Result<Vec<PkiOption>, InitError> {
    if config.pki_only {
        return Ok(vec![PkiOption::PkiOnly]);
    }

    let names = flag_or_ask(
        prompter,
        "What DNS names or IP addresses would you like to add to your new CA?",
        "(e.g. ca.smallstep.com[,1.1.1.1,etc.])",
        given(raw.dns.as_ref()),
        validators::dns_names,
    )?;
    let dns_names = normalize_dns_names(&names);

    let address = flag_or_ask(
        prompter,
        "What IP and port will your new CA bind to?",
        "(e.g. :443 or 127.0.0.1:4343)",
        given(raw.address.as_ref()),
        validators::address,
    )?;

    // Linked deployments get their first provisioner from the linked
    // identity, so only standalone ones name one here.
    let provisioner = if deployment == DeploymentType::Standalone {
        Some(flag_or_ask(
            prompter,
            "What would you like to name the CA's first provisioner?",
            "(e.g. you@smallstep.com)",
            given(raw.provisioner.as_ref()),
            validators::not_empty,
        )?)
    } else {
        None
    };

    let mut options = vec![
        PkiOption::Address(address),
        PkiOption::CaUrl(raw.ca_url.clone().unwrap_or_default()),
        PkiOption::DnsNames(dns_names),
        PkiOption::DeploymentType(deployment),
    ];
    if let Some(provisioner) = provisioner {
        options.push(PkiOption::Provisioner(provisioner));
    }
    if deployment == DeploymentType::Linked {
        options.push(PkiOption::Admin);
    } else if config.ssh {
        options.push(PkiOption::Ssh);
    }
    if config.no_db {
        options.push(PkiOption::NoDb);
    }
    if config.helm {
        options.push(PkiOption::Helm);
    }

    debug!(count = options.len(), "collected PKI options");
    Ok(options)
}
