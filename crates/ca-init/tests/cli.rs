//! Binary-level tests: flag validation, early exits and non-interactive runs.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn cmd(steppath: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ca-init").unwrap();
    cmd.env("STEPPATH", steppath)
        .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn root_requires_key() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--root", "root.crt"])
        .assert()
        .failure()
        .stderr(contains("flag '--root' requires the '--key' flag"));
}

#[test]
fn key_requires_root() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--key", "root.key"])
        .assert()
        .failure()
        .stderr(contains("flag '--key' requires the '--root' flag"));
}

#[test]
fn pki_is_incompatible_with_no_db() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--pki", "--no-db"])
        .assert()
        .failure()
        .stderr(contains("flag '--pki' is incompatible with '--no-db'"));
}

#[test]
fn pki_is_incompatible_with_helm() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--pki", "--helm"])
        .assert()
        .failure()
        .stderr(contains("flag '--pki' is incompatible with '--helm'"));
}

#[test]
fn unknown_ra_names_options() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--ra", "Vault"])
        .assert()
        .failure()
        .stderr(contains("StepCAS or CloudCAS"));
}

#[test]
fn unknown_deployment_type_names_options() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--deployment-type", "cluster"])
        .assert()
        .failure()
        .stderr(contains("standalone, linked or hosted"));
}

#[test]
fn hosted_prints_guidance_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--deployment-type", "Hosted"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("step ca bootstrap --team <name>"));
    assert!(!dir.path().join("config").exists());
}

#[test]
fn missing_password_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(dir.path())
        .args(["--password-file"])
        .arg(dir.path().join("missing"))
        .assert()
        .failure()
        .stderr(contains("error reading"));
}

fn non_interactive(dir: &Path) -> Command {
    let password = dir.join("password");
    std::fs::write(&password, "s3cret\n").unwrap();
    let mut cmd = cmd(&dir.join("step"));
    cmd.args([
        "--deployment-type",
        "standalone",
        "--name",
        "Acme",
        "--dns",
        "ca.example.com,127.0.0.1",
        "--address",
        ":8443",
        "--provisioner",
        "admin@example.com",
    ])
    .arg("--password-file")
    .arg(&password);
    cmd
}

#[test]
fn standalone_writes_pki_tree() {
    let dir = tempfile::tempdir().unwrap();
    non_interactive(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("Generating root certificate... done!"))
        .stderr(contains("Your PKI is ready to go."));

    let step = dir.path().join("step");
    assert!(step.join("certs/root_ca.crt").exists());
    assert!(step.join("secrets/intermediate_ca_key").exists());
    assert!(step.join("db").is_dir());

    let defaults = std::fs::read_to_string(step.join("config/defaults.json")).unwrap();
    assert!(defaults.contains("https://ca.example.com:8443"));
}

#[test]
fn helm_writes_template_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    non_interactive(dir.path())
        .arg("--helm")
        .assert()
        .success()
        .stdout(contains("\"inject\""))
        .stdout(contains("BEGIN CERTIFICATE"));
    assert!(!dir.path().join("step/config/ca.json").exists());
}

#[test]
fn cloudcas_warns_before_prompting_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    non_interactive(dir.path())
        .args([
            "--ra",
            "CloudCAS",
            "--issuer",
            "projects/p/locations/us-west1/caPools/pool/certificateAuthorities/ca",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("the cloudcas backend has no certificate authority service client"))
        .stderr(contains("unsupported"));
    assert!(!dir.path().join("step/certs").exists());
}
