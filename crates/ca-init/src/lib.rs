//! # ca-init
//!
//! Bootstraps the PKI of a new certificate authority, or of a registration
//! authority in front of a remote issuer.
//!
//! A run validates the flags, selects a backend and deployment type,
//! collects the remaining parameters from flags or prompts, and drives the
//! [`ca_pki::Pki`] calls in dependency order:
//!
//! ```text
//! RawInput ─► resolve ─► select ─► collect_options ─► ProvisioningPlan ─► Pki
//! ```
//!
//! Prompts go through the [`prompt::Prompter`] trait and the randomness
//! preflight through [`entropy::EntropyProbe`], so the whole flow can run
//! against scripted answers and a fake PKI.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod collect;
pub mod entropy;
pub mod error;
pub mod input;
pub mod orchestrate;
pub mod plan;
pub mod prompt;
pub mod select;
pub mod validators;

pub use cli::{Cli, InitArgs};
pub use entropy::{EntropyProbe, OsEntropy};
pub use error::InitError;
pub use input::{RaBackend, RawInput, ValidatedConfig};
pub use orchestrate::{Outcome, run};
pub use plan::{ProvisioningPlan, Step};
pub use prompt::{Answer, Prompter, ScriptedPrompter, TerminalPrompter};
pub use select::{BackendChoice, Bootstrap, CloudCasChoice, Selection};
