//! End-to-end tests of the bootstrap flow against a recording PKI.
//!
//! These tests verify:
//! 1. Provisioning calls happen in dependency order
//! 2. A failing step stops the run before persistence
//! 3. Flag and entropy failures happen before any PKI call
//! 4. Hosted deployments provision nothing
//! 5. The real filesystem PKI produces a complete tree

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use ca_init::{Answer, EntropyProbe, InitError, Outcome, RawInput, ScriptedPrompter, run};
use ca_pki::{
    CasOptions, Certificate, DeploymentType, FilePki, Pki, PkiOption, PkiPaths, RootAuthority,
    SaveSummary,
};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    New(CasOptions, Vec<PkiOption>),
    KeyPairs(Vec<u8>),
    Root(String, String),
    WriteRoot(String),
    Intermediate(String),
    GetAuthority,
    SshKeys,
    Helm,
    Save,
}

type Log = Rc<RefCell<Vec<Call>>>;

struct RecordingPki {
    log: Log,
    fail_intermediate: bool,
}

impl Pki for RecordingPki {
    fn generate_key_pairs(&mut self, password: &[u8]) -> ca_pki::Result<()> {
        self.log.borrow_mut().push(Call::KeyPairs(password.to_vec()));
        Ok(())
    }

    fn generate_root_certificate(
        &mut self,
        name: &str,
        organization: &str,
        _resource: &str,
        _password: &[u8],
    ) -> ca_pki::Result<RootAuthority> {
        self.log
            .borrow_mut()
            .push(Call::Root(name.to_string(), organization.to_string()));
        ca_pki::ca::generate_root(name, organization)
    }

    fn write_root_certificate(&mut self, root: &Certificate) -> ca_pki::Result<()> {
        self.log.borrow_mut().push(Call::WriteRoot(root.subject().to_string()));
        Ok(())
    }

    fn generate_intermediate_certificate(
        &mut self,
        _name: &str,
        _organization: &str,
        _resource: &str,
        root: &RootAuthority,
        _password: &[u8],
    ) -> ca_pki::Result<()> {
        self.log
            .borrow_mut()
            .push(Call::Intermediate(root.certificate().subject().to_string()));
        if self.fail_intermediate {
            return Err(ca_pki::Error::Generation("intermediate signing failed".into()));
        }
        Ok(())
    }

    fn get_certificate_authority(&mut self) -> ca_pki::Result<()> {
        self.log.borrow_mut().push(Call::GetAuthority);
        Ok(())
    }

    fn generate_ssh_signing_keys(&mut self, _password: &[u8]) -> ca_pki::Result<()> {
        self.log.borrow_mut().push(Call::SshKeys);
        Ok(())
    }

    fn write_helm_template(&self, out: &mut dyn Write) -> ca_pki::Result<()> {
        self.log.borrow_mut().push(Call::Helm);
        writeln!(out, "inject: {{}}").map_err(|source| ca_pki::Error::Write {
            path: "<stdout>".into(),
            source,
        })
    }

    fn save(&self) -> ca_pki::Result<SaveSummary> {
        self.log.borrow_mut().push(Call::Save);
        Ok(SaveSummary::default())
    }
}

struct NoEntropy;

impl EntropyProbe for NoEntropy {
    fn check(&self) -> Result<(), InitError> {
        Err(InitError::RandomnessUnavailable("device not ready".into()))
    }
}

struct GoodEntropy;

impl EntropyProbe for GoodEntropy {
    fn check(&self) -> Result<(), InitError> {
        Ok(())
    }
}

struct Harness {
    log: Log,
    prompter: ScriptedPrompter,
    stdout: Vec<u8>,
}

impl Harness {
    fn new(answers: Vec<Answer>) -> Self {
        Self {
            log: Rc::default(),
            prompter: ScriptedPrompter::new(answers),
            stdout: Vec::new(),
        }
    }

    fn run_with(
        &mut self,
        raw: &RawInput,
        entropy: &dyn EntropyProbe,
        fail_intermediate: bool,
    ) -> Result<Outcome, InitError> {
        let log = Rc::clone(&self.log);
        run(
            raw,
            &mut self.prompter,
            entropy,
            move |cas, options| {
                log.borrow_mut().push(Call::New(cas, options));
                Ok(RecordingPki {
                    log,
                    fail_intermediate,
                })
            },
            &mut self.stdout,
        )
    }

    fn run(&mut self, raw: &RawInput) -> Result<Outcome, InitError> {
        self.run_with(raw, &GoodEntropy, false)
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Calls after construction.
    fn steps(&self) -> Vec<Call> {
        self.calls().into_iter().skip(1).collect()
    }
}

fn standalone() -> RawInput {
    RawInput {
        deployment_type: Some("standalone".into()),
        name: Some("Acme".into()),
        dns: Some("ca.example.com, 1.1.1.1".into()),
        address: Some(":443".into()),
        provisioner: Some("admin@example.com".into()),
        ..RawInput::default()
    }
}

// ============================================================================
// Sequencing
// ============================================================================

#[test]
fn test_standalone_full_sequence_in_order() {
    let mut harness = Harness::new(vec![Answer::Password("s3cret".into())]);
    let outcome = harness.run(&standalone()).unwrap();

    assert!(matches!(outcome, Outcome::Saved(_)));
    assert_eq!(
        harness.steps(),
        vec![
            Call::KeyPairs(b"s3cret".to_vec()),
            Call::Root("Acme".into(), "Acme".into()),
            Call::Intermediate("Acme Root CA".into()),
            Call::Save,
        ]
    );

    let calls = harness.calls();
    let Call::New(cas, options) = &calls[0] else {
        unreachable!()
    };
    assert_eq!(cas, &CasOptions::Soft);
    assert!(options.contains(&PkiOption::DnsNames(vec![
        "ca.example.com".into(),
        "1.1.1.1".into()
    ])));
    assert!(options.contains(&PkiOption::Provisioner("admin@example.com".into())));

    let output = harness.prompter.output();
    assert!(output.contains("Choose a password for your CA keys and first provisioner."));
    assert!(output.contains("Generating root certificate... done!"));
    assert!(output.contains("Generating intermediate certificate... done!"));
}

#[test]
fn test_intermediate_failure_prevents_save() {
    let mut harness = Harness::new(vec![Answer::Password("s3cret".into())]);
    let err = harness
        .run_with(&standalone(), &GoodEntropy, true)
        .unwrap_err();

    assert!(matches!(err, InitError::Pki(ca_pki::Error::Generation(_))));
    let steps = harness.steps();
    assert!(steps.iter().any(|c| matches!(c, Call::Intermediate(_))));
    assert!(!steps.contains(&Call::Save));
    assert!(!steps.contains(&Call::Helm));
}

#[test]
fn test_provisioner_password_file_used_for_key_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let ca_password = dir.path().join("ca-password");
    let provisioner_password = dir.path().join("provisioner-password");
    std::fs::write(&ca_password, "ca-pass\n").unwrap();
    std::fs::write(&provisioner_password, "prov-pass\n").unwrap();

    let raw = RawInput {
        password_file: Some(ca_password),
        provisioner_password_file: Some(provisioner_password),
        ..standalone()
    };
    let mut harness = Harness::new(vec![]);
    harness.run(&raw).unwrap();

    assert_eq!(harness.steps()[0], Call::KeyPairs(b"prov-pass".to_vec()));
    assert!(!harness.prompter.output().contains("Choose a password"));
}

#[test]
fn test_empty_password_is_generated_and_shown() {
    let mut harness = Harness::new(vec![Answer::Password(String::new())]);
    harness.run(&standalone()).unwrap();

    let output = harness.prompter.output();
    let shown = output
        .lines()
        .find_map(|line| line.strip_prefix("✔ Password: "))
        .unwrap();
    assert_eq!(shown.len(), 32);
    assert_eq!(harness.steps()[0], Call::KeyPairs(shown.as_bytes().to_vec()));
}

#[test]
fn test_supplied_root_is_copied_not_generated() {
    let dir = tempfile::tempdir().unwrap();
    let root = ca_pki::ca::generate_root("Supplied", "").unwrap();
    let crt = dir.path().join("root.crt");
    let key = dir.path().join("root.key");
    std::fs::write(&crt, root.certificate().pem()).unwrap();
    std::fs::write(&key, root.key().pem()).unwrap();

    let raw = RawInput {
        root: Some(crt),
        key: Some(key),
        ..standalone()
    };
    let mut harness = Harness::new(vec![Answer::Password("pw".into())]);
    harness.run(&raw).unwrap();

    let steps = harness.steps();
    assert_eq!(steps[1], Call::WriteRoot("Supplied Root CA".into()));
    assert_eq!(steps[2], Call::Intermediate("Supplied Root CA".into()));
    assert!(!steps.iter().any(|c| matches!(c, Call::Root(..))));
    assert!(harness.prompter.output().contains("Copying root certificate... done!"));
}

#[test]
fn test_linked_pki_only_ssh_helm_variants() {
    let raw = RawInput {
        deployment_type: Some("linked".into()),
        ssh: true,
        helm: true,
        ..standalone()
    };
    let mut harness = Harness::new(vec![Answer::Password("pw".into())]);
    let outcome = harness.run(&raw).unwrap();

    assert_eq!(outcome, Outcome::HelmTemplate);
    assert_eq!(
        harness.steps(),
        vec![
            Call::Root("Acme".into(), "Acme".into()),
            Call::Intermediate("Acme Root CA".into()),
            Call::SshKeys,
            Call::Helm,
        ]
    );
    assert_eq!(String::from_utf8(harness.stdout.clone()).unwrap(), "inject: {}\n");
    assert!(harness.prompter.output().contains("Choose a password for your CA keys.\n"));

    let calls = harness.calls();
    let Call::New(_, options) = &calls[0] else {
        unreachable!()
    };
    assert!(options.contains(&PkiOption::Admin));
    assert!(options.contains(&PkiOption::DeploymentType(DeploymentType::Linked)));
}

#[test]
fn test_pki_only_skips_provisioner_and_prompts() {
    let raw = RawInput {
        pki_only: true,
        deployment_type: Some("standalone".into()),
        name: Some("Acme".into()),
        ..RawInput::default()
    };
    let mut harness = Harness::new(vec![Answer::Password("pw".into())]);
    harness.run(&raw).unwrap();

    assert_eq!(harness.calls()[0], Call::New(CasOptions::Soft, vec![PkiOption::PkiOnly]));
    assert!(!harness.steps().iter().any(|c| matches!(c, Call::KeyPairs(_))));
    assert_eq!(harness.prompter.remaining(), 0);
}

#[test]
fn test_stepcas_fetches_remote_authority() {
    let raw = RawInput {
        ra: Some("StepCAS".into()),
        deployment_type: Some("standalone".into()),
        issuer: Some("https://ca.example.com:9000".into()),
        issuer_fingerprint: Some("4fe5f5ef09e95c803fdcb80b8cf511e2a885eb86f3ce74e3e90e62fa3faf1531".into()),
        issuer_provisioner: Some("ra@example.com".into()),
        dns: Some("ra.example.com".into()),
        address: Some(":443".into()),
        provisioner: Some("admin".into()),
        ..RawInput::default()
    };
    let mut harness = Harness::new(vec![Answer::Password("pw".into())]);
    harness.run(&raw).unwrap();

    assert_eq!(
        harness.steps(),
        vec![Call::KeyPairs(b"pw".to_vec()), Call::GetAuthority, Call::Save]
    );
    let calls = harness.calls();
    let Call::New(CasOptions::StepCas(options), _) = &calls[0] else {
        unreachable!()
    };
    assert_eq!(options.issuer.provisioner, "ra@example.com");
}

// ============================================================================
// Early exits
// ============================================================================

#[test]
fn test_hosted_local_provisions_nothing() {
    let raw = RawInput {
        deployment_type: Some("Hosted".into()),
        ..RawInput::default()
    };
    let mut harness = Harness::new(vec![]);
    let outcome = harness.run(&raw).unwrap();

    assert_eq!(outcome, Outcome::Hosted);
    assert!(harness.calls().is_empty());
    assert!(harness.stdout.is_empty());
    assert!(harness.prompter.output().contains("step ca bootstrap --team <name>"));
}

#[test]
fn test_hosted_deployment_rejected_for_ra() {
    let raw = RawInput {
        ra: Some("stepcas".into()),
        deployment_type: Some("hosted".into()),
        ..RawInput::default()
    };
    let mut harness = Harness::new(vec![]);
    let err = harness.run(&raw).unwrap_err();

    assert!(err.is_flag_error());
    assert!(harness.calls().is_empty());
}

#[test]
fn test_flag_errors_before_any_prompt_or_call() {
    let cases = [
        RawInput {
            root: Some("root.crt".into()),
            ..standalone()
        },
        RawInput {
            key: Some("root.key".into()),
            ..standalone()
        },
        RawInput {
            ra: Some("vault".into()),
            ..standalone()
        },
        RawInput {
            pki_only: true,
            no_db: true,
            ..standalone()
        },
        RawInput {
            pki_only: true,
            helm: true,
            ..standalone()
        },
    ];

    for raw in cases {
        let mut harness = Harness::new(vec![]);
        let err = harness.run(&raw).unwrap_err();
        assert!(err.is_flag_error(), "{err}");
        assert!(harness.calls().is_empty());
        assert!(harness.prompter.questions().is_empty());
    }
}

#[test]
fn test_entropy_failure_is_fatal_first() {
    let raw = RawInput {
        deployment_type: Some("hosted".into()),
        ..RawInput::default()
    };
    let mut harness = Harness::new(vec![]);
    let err = harness.run_with(&raw, &NoEntropy, false).unwrap_err();

    assert!(matches!(err, InitError::RandomnessUnavailable(_)));
    assert!(harness.calls().is_empty());
    assert!(harness.prompter.output().is_empty());
}

#[test]
fn test_construction_failure_is_fatal() {
    let mut harness = Harness::new(vec![]);
    let err = run(
        &standalone(),
        &mut harness.prompter,
        &GoodEntropy,
        |_, _| -> ca_pki::Result<RecordingPki> {
            Err(ca_pki::Error::Validation("bad address".into()))
        },
        &mut harness.stdout,
    )
    .unwrap_err();

    assert!(matches!(err, InitError::Pki(ca_pki::Error::Validation(_))));
    assert!(!harness.prompter.output().contains("Choose a password"));
}

// ============================================================================
// Filesystem PKI
// ============================================================================

#[test]
fn test_file_pki_writes_complete_tree() {
    let dir = tempfile::tempdir().unwrap();
    let paths = PkiPaths::new(dir.path());
    let mut prompter = ScriptedPrompter::new(vec![Answer::Password("s3cret".into())]);
    let mut stdout = Vec::new();

    let outcome = run(
        &RawInput {
            ssh: true,
            ..standalone()
        },
        &mut prompter,
        &GoodEntropy,
        |cas, options| FilePki::with_paths(paths.clone(), cas, options),
        &mut stdout,
    )
    .unwrap();

    let Outcome::Saved(summary) = outcome else {
        unreachable!()
    };
    assert!(summary.entries().iter().any(|(label, _)| label == "Root fingerprint"));
    for path in [
        paths.root_crt(),
        paths.root_key(),
        paths.intermediate_crt(),
        paths.intermediate_key(),
        paths.ssh_host_pub(),
        paths.ssh_user_key(),
        paths.ca_config(),
        paths.defaults(),
    ] {
        assert!(path.exists(), "{} missing", path.display());
    }

    let config: serde_json::Value =
        serde_json::from_slice(&std::fs::read(paths.ca_config()).unwrap()).unwrap();
    assert_eq!(config["dnsNames"], serde_json::json!(["ca.example.com", "1.1.1.1"]));
    assert_eq!(config["authority"]["provisioners"][0]["name"], "admin@example.com");
    assert!(prompter.output().contains("Your PKI is ready to go."));
    assert!(stdout.is_empty());
}

#[test]
fn test_file_pki_helm_writes_only_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let paths = PkiPaths::new(dir.path());
    let mut prompter = ScriptedPrompter::new(vec![Answer::Password("s3cret".into())]);
    let mut stdout = Vec::new();

    let outcome = run(
        &RawInput {
            helm: true,
            ..standalone()
        },
        &mut prompter,
        &GoodEntropy,
        |cas, options| FilePki::with_paths(paths.clone(), cas, options),
        &mut stdout,
    )
    .unwrap();

    assert_eq!(outcome, Outcome::HelmTemplate);
    let values: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
    assert!(values["inject"]["certificates"]["root_ca"].is_string());
    assert!(!paths.root_crt().exists());
    assert!(!paths.ca_config().exists());
}
