//! The bootstrap flow from raw flags to a provisioned PKI.

use std::io::Write;

use ca_pki::{CasOptions, DeploymentType, Pki, PkiOption, RootAuthority, SaveSummary};
use rand::Rng;
use rand::rngs::OsRng;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::collect::collect_options;
use crate::entropy::EntropyProbe;
use crate::error::InitError;
use crate::input::{RawInput, ValidatedConfig, resolve};
use crate::plan::{ProvisioningPlan, Step};
use crate::prompt::Prompter;
use crate::select::{Bootstrap, Selection, select};

/// Length of generated passwords.
const GENERATED_PASSWORD_LEN: usize = 32;

const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const HOSTED_GUIDANCE: &[&str] = &[
    "",
    "The initialization of a hosted deployment is not yet supported by this tool.",
    "But you can create one at https://smallstep.com/certificate-manager/",
    "",
    "After creating it you can bootstrap it running:",
    "",
    "    $ step ca bootstrap --team <name>",
    "",
];

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Hosted deployment; guidance was printed and nothing generated.
    Hosted,
    /// The helm template was written to the output.
    HelmTemplate,
    /// The configuration tree was saved.
    Saved(SaveSummary),
}

/// Runs the bootstrap flow.
///
/// Secure randomness is checked first, then flags are validated before
/// anything is asked. Backend and topology are selected, construction
/// options collected, and the resulting [`ProvisioningPlan`] is executed
/// against the PKI returned by `create_pki`. The first failing step ends
/// the run; files already written are left in place.
///
/// # Errors
///
/// Returns the first validation, prompt, generation or persistence error.
pub fn run<P, F>(
    raw: &RawInput,
    prompter: &mut dyn Prompter,
    entropy: &dyn EntropyProbe,
    create_pki: F,
    out: &mut dyn Write,
) -> Result<Outcome, InitError>
where
    P: Pki,
    F: FnOnce(CasOptions, Vec<PkiOption>) -> ca_pki::Result<P>,
{
    entropy.check()?;
    let config = resolve(raw)?;

    let bootstrap = match select(prompter, raw, &config)? {
        Selection::Hosted => {
            info!("hosted deployment requested, nothing to provision");
            for line in HOSTED_GUIDANCE {
                prompter.say(line)?;
            }
            return Ok(Outcome::Hosted);
        }
        Selection::Provision(bootstrap) => bootstrap,
    };

    let options = collect_options(prompter, raw, &config, bootstrap.deployment)?;
    let plan = ProvisioningPlan::build(&config, &bootstrap);
    info!(%plan, "provisioning plan");

    let mut pki = create_pki(bootstrap.cas_options(), options)?;
    let password = choose_password(prompter, &config, &bootstrap)?;

    execute(&plan, &mut pki, prompter, &config, &bootstrap, &password, out)
}

fn choose_password(
    prompter: &mut dyn Prompter,
    config: &ValidatedConfig,
    bootstrap: &Bootstrap,
) -> Result<Zeroizing<String>, InitError> {
    if let Some(password) = config.password.as_ref().filter(|p| !p.is_empty()) {
        return Ok(password.clone());
    }

    if config.pki_only || bootstrap.deployment != DeploymentType::Standalone {
        prompter.say("Choose a password for your CA keys.")?;
    } else {
        prompter.say("Choose a password for your CA keys and first provisioner.")?;
    }

    let answer = prompter.ask_password("[leave empty and we'll generate one]")?;
    if !answer.is_empty() {
        return Ok(answer);
    }

    let generated = generate_password();
    prompter.say(&format!("✔ Password: {}", generated.as_str()))?;
    Ok(generated)
}

fn generate_password() -> Zeroizing<String> {
    let mut rng = OsRng;
    Zeroizing::new(
        (0..GENERATED_PASSWORD_LEN)
            .map(|_| char::from(PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]))
            .collect(),
    )
}

fn execute<P: Pki>(
    plan: &ProvisioningPlan,
    pki: &mut P,
    prompter: &mut dyn Prompter,
    config: &ValidatedConfig,
    bootstrap: &Bootstrap,
    password: &Zeroizing<String>,
    out: &mut dyn Write,
) -> Result<Outcome, InitError> {
    let names = bootstrap.names();
    let password = password.as_bytes();
    let mut root: Option<RootAuthority> = None;

    for step in plan.steps() {
        debug!(%step, "running step");
        match step {
            Step::GenerateProvisionerKeys => {
                let provisioner_password = config
                    .provisioner_password
                    .as_ref()
                    .filter(|p| !p.is_empty())
                    .map_or(password, |p| p.as_bytes());
                pki.generate_key_pairs(provisioner_password)?;
            }
            Step::GenerateRoot => {
                prompter.say("")?;
                prompter.print("Generating root certificate... ")?;
                root = Some(pki.generate_root_certificate(
                    &names.name,
                    &names.organization,
                    &names.resource,
                    password,
                )?);
                prompter.say("done!")?;
            }
            Step::ImportRoot => {
                let supplied = config
                    .root
                    .clone()
                    .ok_or_else(|| missing("a supplied root certificate"))?;
                prompter.say("")?;
                prompter.print("Copying root certificate... ")?;
                pki.write_root_certificate(supplied.certificate())?;
                root = Some(supplied);
                prompter.say("done!")?;
            }
            Step::GenerateIntermediate => {
                let root = root.as_ref().ok_or_else(|| missing("a root certificate"))?;
                prompter.print("Generating intermediate certificate... ")?;
                pki.generate_intermediate_certificate(
                    &names.name,
                    &names.organization,
                    &names.resource,
                    root,
                    password,
                )?;
                prompter.say("done!")?;
            }
            Step::FetchAuthority => pki.get_certificate_authority()?,
            Step::GenerateSshKeys => {
                prompter.print("Generating user and host SSH certificate signing keys... ")?;
                pki.generate_ssh_signing_keys(password)?;
                prompter.say("done!")?;
            }
            Step::WriteHelmTemplate => {
                pki.write_helm_template(out)?;
                return Ok(Outcome::HelmTemplate);
            }
            Step::Save => {
                let summary = pki.save()?;
                prompter.say("")?;
                for (label, value) in summary.entries() {
                    prompter.say(&format!("✔ {label}: {value}"))?;
                }
                prompter.say("")?;
                prompter.say("Your PKI is ready to go.")?;
                return Ok(Outcome::Saved(summary));
            }
        }
    }

    Err(missing("a final write step"))
}

fn missing(what: &str) -> InitError {
    InitError::Pki(ca_pki::Error::Validation(format!("provisioning plan is missing {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_is_url_safe() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(
            password
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
        assert_ne!(generate_password().as_str(), password.as_str());
    }

    #[test]
    fn hosted_guidance_points_to_bootstrap() {
        assert!(HOSTED_GUIDANCE.iter().any(|line| line.contains("step ca bootstrap --team")));
    }
}
