//! The ordered provisioning steps for a run.

use std::fmt;

use ca_pki::DeploymentType;

use crate::input::ValidatedConfig;
use crate::select::Bootstrap;

/// One call into the PKI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Generate the first provisioner's key pair.
    GenerateProvisionerKeys,
    /// Generate a new root certificate and key.
    GenerateRoot,
    /// Write the operator-supplied root certificate.
    ImportRoot,
    /// Generate the intermediate certificate signed by the root.
    GenerateIntermediate,
    /// Retrieve the upstream authority's root certificate.
    FetchAuthority,
    /// Generate SSH user and host signing keys.
    GenerateSshKeys,
    /// Render the helm template to standard output.
    WriteHelmTemplate,
    /// Persist the configuration tree.
    Save,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GenerateProvisionerKeys => "generate-provisioner-keys",
            Self::GenerateRoot => "generate-root",
            Self::ImportRoot => "import-root",
            Self::GenerateIntermediate => "generate-intermediate",
            Self::FetchAuthority => "fetch-authority",
            Self::GenerateSshKeys => "generate-ssh-keys",
            Self::WriteHelmTemplate => "write-helm-template",
            Self::Save => "save",
        };
        f.write_str(name)
    }
}

/// Steps in dependency order.
///
/// The root always precedes the intermediate, and exactly one of
/// [`Step::WriteHelmTemplate`] and [`Step::Save`] comes last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    steps: Vec<Step>,
}

impl ProvisioningPlan {
    /// Builds the plan for a validated configuration and selected bootstrap.
    #[must_use]
    pub fn build(config: &ValidatedConfig, bootstrap: &Bootstrap) -> Self {
        let mut steps = Vec::new();

        if !config.pki_only && bootstrap.deployment == DeploymentType::Standalone {
            steps.push(Step::GenerateProvisionerKeys);
        }

        if bootstrap.is_creator() {
            steps.push(if config.root.is_some() {
                Step::ImportRoot
            } else {
                Step::GenerateRoot
            });
            steps.push(Step::GenerateIntermediate);
        } else {
            steps.push(Step::FetchAuthority);
        }

        if config.ssh {
            steps.push(Step::GenerateSshKeys);
        }

        steps.push(if config.helm {
            Step::WriteHelmTemplate
        } else {
            Step::Save
        });

        Self { steps }
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for ProvisioningPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
