//! Backend and deployment topology selection.
//!
//! The result is a small decision tree: a hosted local CA ends the run
//! early, every other combination becomes a [`Bootstrap`] carrying exactly
//! one backend and one deployment type.

use std::path::PathBuf;

use ca_pki::{CasOptions, CertificateIssuer, CloudCasOptions, DeploymentType, StepCasOptions};
use tracing::{info, warn};

use crate::error::InitError;
use crate::input::{RaBackend, RawInput, ValidatedConfig, given};
use crate::prompt::{Prompter, TextPrompt, flag_or_ask};
use crate::validators;

const DEPLOYMENT_QUESTION: &str = "What deployment type would you like to configure?";

const RA_DEPLOYMENTS: &[(&str, DeploymentType)] = &[
    ("Standalone RA", DeploymentType::Standalone),
    ("Linked RA", DeploymentType::Linked),
];

const CA_DEPLOYMENTS: &[(&str, DeploymentType)] = &[
    ("Standalone CA", DeploymentType::Standalone),
    ("Linked CA", DeploymentType::Linked),
    ("Hosted CA", DeploymentType::Hosted),
];

const POOL_TIERS: &[(&str, &str)] = &[("DevOps", "DEVOPS"), ("Enterprise", "ENTERPRISE")];

/// Outcome of backend and topology selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A hosted deployment of a local CA; nothing is provisioned.
    Hosted,
    /// Provision with the selected backend and topology.
    Provision(Bootstrap),
}

/// A backend and deployment type that can be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// Standalone or linked.
    pub deployment: DeploymentType,
    /// Backend and its parameters.
    pub backend: BackendChoice,
}

/// Backend parameters collected for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendChoice {
    /// Local CA.
    Local {
        /// PKI name, also used as the organization.
        name: String,
    },
    /// Cloud certificate authority service.
    CloudCas {
        /// Service account key, if any.
        credentials_file: Option<PathBuf>,
        /// Create a new authority or use an existing one.
        choice: CloudCasChoice,
    },
    /// Registration authority in front of another CA.
    StepCas {
        /// Upstream URL.
        url: String,
        /// Upstream root fingerprint.
        fingerprint: String,
        /// Upstream JWK provisioner.
        provisioner: String,
    },
}

/// The cloud authority to issue from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCasChoice {
    /// Create root and intermediate authorities in the service.
    Create {
        /// PKI name.
        name: String,
        /// Organization name.
        organization: String,
        /// Resource id prefix.
        resource: String,
        /// Project id.
        project: String,
        /// Location.
        location: String,
        /// CA pool name.
        ca_pool: String,
        /// CA pool tier value.
        ca_pool_tier: String,
        /// Storage bucket; empty for a managed one.
        gcs_bucket: String,
    },
    /// Use an existing authority.
    Existing {
        /// Fully-qualified authority resource.
        authority: String,
    },
}

/// Names passed to root and intermediate generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    /// PKI name.
    pub name: String,
    /// Organization.
    pub organization: String,
    /// Resource id (cloud backend only).
    pub resource: String,
}

impl Bootstrap {
    /// Returns true when this run creates root and intermediate certificates.
    #[must_use]
    pub const fn is_creator(&self) -> bool {
        match &self.backend {
            BackendChoice::Local { .. } => true,
            BackendChoice::CloudCas { choice, .. } => matches!(choice, CloudCasChoice::Create { .. }),
            BackendChoice::StepCas { .. } => false,
        }
    }

    /// Builds the backend options handed to the PKI.
    #[must_use]
    pub fn cas_options(&self) -> CasOptions {
        match &self.backend {
            BackendChoice::Local { .. } => CasOptions::Soft,
            BackendChoice::CloudCas {
                credentials_file,
                choice,
            } => {
                let mut options = CloudCasOptions {
                    credentials_file: credentials_file.clone(),
                    ..CloudCasOptions::default()
                };
                match choice {
                    CloudCasChoice::Create {
                        project,
                        location,
                        ca_pool,
                        ca_pool_tier,
                        gcs_bucket,
                        ..
                    } => {
                        options.is_creator = true;
                        options.project.clone_from(project);
                        options.location.clone_from(location);
                        options.ca_pool.clone_from(ca_pool);
                        options.ca_pool_tier.clone_from(ca_pool_tier);
                        options.gcs_bucket.clone_from(gcs_bucket);
                    }
                    CloudCasChoice::Existing { authority } => {
                        options.certificate_authority.clone_from(authority);
                    }
                }
                CasOptions::CloudCas(options)
            }
            BackendChoice::StepCas {
                url,
                fingerprint,
                provisioner,
            } => CasOptions::StepCas(StepCasOptions {
                certificate_authority: url.clone(),
                fingerprint: fingerprint.clone(),
                issuer: CertificateIssuer {
                    kind: "JWK".into(),
                    provisioner: provisioner.clone(),
                },
            }),
        }
    }

    /// Returns the names used for generated certificates.
    #[must_use]
    pub fn names(&self) -> Names {
        match &self.backend {
            BackendChoice::Local { name } => Names {
                name: name.clone(),
                organization: name.clone(),
                resource: String::new(),
            },
            BackendChoice::CloudCas {
                choice:
                    CloudCasChoice::Create {
                        name,
                        organization,
                        resource,
                        ..
                    },
                ..
            } => Names {
                name: name.clone(),
                organization: organization.clone(),
                resource: resource.clone(),
            },
            BackendChoice::CloudCas { .. } | BackendChoice::StepCas { .. } => Names::default(),
        }
    }
}

/// Resolves the deployment type from `--deployment-type` or a prompt.
///
/// Registration authorities accept standalone and linked; local CAs also
/// accept hosted. Flag values match case-insensitively.
///
/// # Errors
///
/// Returns [`InitError::InvalidFlagValue`] for an unknown flag value, or a
/// prompt error.
pub fn resolve_deployment_type(
    prompter: &mut dyn Prompter,
    flag: Option<&str>,
    is_ra: bool,
) -> Result<DeploymentType, InitError> {
    let (choices, options) = if is_ra {
        (RA_DEPLOYMENTS, "standalone or linked")
    } else {
        (CA_DEPLOYMENTS, "standalone, linked or hosted")
    };

    let value = flag.unwrap_or_default().to_ascii_lowercase();
    if !value.is_empty() {
        return choices
            .iter()
            .map(|(_, deployment)| *deployment)
            .find(|deployment| deployment.as_str() == value)
            .ok_or(InitError::InvalidFlagValue {
                flag: "deployment-type",
                value,
                options,
            });
    }

    let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
    let index = prompter.ask_select(DEPLOYMENT_QUESTION, &labels)?;
    choices
        .get(index)
        .map(|(_, deployment)| *deployment)
        .ok_or_else(|| InitError::Prompt(format!("no deployment type at index {index}")))
}

/// Selects the backend and deployment type, collecting backend parameters.
///
/// # Errors
///
/// Returns a flag error for an invalid deployment type or a prompt error.
pub fn select(
    prompter: &mut dyn Prompter,
    raw: &RawInput,
    config: &ValidatedConfig,
) -> Result<Selection, InitError> {
    if config.backend == RaBackend::CloudCas {
        warn!(
            "the cloudcas backend has no certificate authority service client in this build; \
             the run will stop before any key is generated"
        );
    }

    let deployment =
        resolve_deployment_type(prompter, raw.deployment_type.as_deref(), config.backend.is_ra())?;
    info!(backend = ?config.backend, %deployment, "deployment selected");

    let backend = match config.backend {
        RaBackend::CloudCas => BackendChoice::CloudCas {
            credentials_file: raw.credentials_file.clone(),
            choice: select_cloudcas(prompter, raw)?,
        },
        RaBackend::StepCas => select_stepcas(prompter, raw)?,
        RaBackend::Local => {
            if deployment == DeploymentType::Hosted {
                return Ok(Selection::Hosted);
            }
            BackendChoice::Local {
                name: ask_pki_name(prompter, raw)?,
            }
        }
    };

    Ok(Selection::Provision(Bootstrap { deployment, backend }))
}

fn ask_pki_name(prompter: &mut dyn Prompter, raw: &RawInput) -> Result<String, InitError> {
    flag_or_ask(
        prompter,
        "What would you like to name your new PKI?",
        "(e.g. Smallstep)",
        given(raw.name.as_ref()),
        validators::not_empty,
    )
}

fn ask(
    prompter: &mut dyn Prompter,
    question: &str,
    hint: &str,
    validate: validators::Validator,
) -> Result<String, InitError> {
    prompter.ask_text(
        &TextPrompt {
            question,
            hint,
            default: None,
        },
        validate,
    )
}

fn select_cloudcas(prompter: &mut dyn Prompter, raw: &RawInput) -> Result<CloudCasChoice, InitError> {
    if let Some(authority) = given(raw.issuer.as_ref()) {
        return Ok(CloudCasChoice::Existing {
            authority: authority.to_string(),
        });
    }

    let create = prompter
        .ask_yes_no("Would you like to create a new PKI (y) or use an existing one (n)?")?;
    if !create {
        let authority = ask(
            prompter,
            "What certificate authority would you like to use?",
            "(e.g. projects/smallstep-ca/locations/us-west1/caPools/smallstep/certificateAuthorities/intermediate-ca)",
            validators::authority_resource,
        )?;
        return Ok(CloudCasChoice::Existing { authority });
    }

    let name = ask_pki_name(prompter, raw)?;
    let organization = ask(
        prompter,
        "What is the name of your organization?",
        "(e.g. Smallstep)",
        validators::not_empty,
    )?;
    let resource = ask(
        prompter,
        "What resource id do you want to use? [we will append -Root-CA or -Intermediate-CA]",
        "(e.g. Smallstep)",
        validators::resource_id,
    )?;
    let project = ask(
        prompter,
        "What is the id of your project on Google's Cloud Platform?",
        "(e.g. smallstep-ca)",
        validators::project_id,
    )?;
    let location = ask(
        prompter,
        "What region or location do you want to use?",
        "(e.g. us-west1)",
        validators::location,
    )?;
    let ca_pool = ask(
        prompter,
        "What CA pool name do you want to use?",
        "(e.g. Smallstep)",
        validators::ca_pool,
    )?;

    let tiers: Vec<&str> = POOL_TIERS.iter().map(|(label, _)| *label).collect();
    let tier = prompter.ask_select("What CA pool tier do you want to use?", &tiers)?;
    let ca_pool_tier = POOL_TIERS
        .get(tier)
        .map(|(_, value)| (*value).to_string())
        .ok_or_else(|| InitError::Prompt(format!("no pool tier at index {tier}")))?;

    let gcs_bucket = ask(
        prompter,
        "What GCS bucket do you want to use? Leave it empty to use a managed one.",
        "(e.g. my-bucket)",
        validators::gcs_bucket,
    )?;

    Ok(CloudCasChoice::Create {
        name,
        organization,
        resource,
        project,
        location,
        ca_pool,
        ca_pool_tier,
        gcs_bucket,
    })
}

fn select_stepcas(prompter: &mut dyn Prompter, raw: &RawInput) -> Result<BackendChoice, InitError> {
    let url = flag_or_ask(
        prompter,
        "What is the url of your CA?",
        "(e.g. https://ca.smallstep.com:9000)",
        given(raw.issuer.as_ref()),
        validators::https_url,
    )?;
    let fingerprint = flag_or_ask(
        prompter,
        "What is the fingerprint of the CA's root file?",
        "(e.g. 4fe5f5ef09e95c803fdcb80b8cf511e2a885eb86f3ce74e3e90e62fa3faf1531)",
        given(raw.issuer_fingerprint.as_ref()),
        validators::fingerprint,
    )?;
    let provisioner = flag_or_ask(
        prompter,
        "What is the JWK provisioner you want to use?",
        "(e.g. you@smallstep.com)",
        given(raw.issuer_provisioner.as_ref()),
        validators::not_empty,
    )?;
    Ok(BackendChoice::StepCas {
        url,
        fingerprint,
        provisioner,
    })
}
