//! `ca-init` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ca_init::{Cli, OsEntropy, RawInput, TerminalPrompter};
use ca_pki::FilePki;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let raw = RawInput::from(&cli.init);
    let mut prompter = TerminalPrompter::new();
    let mut stdout = io::stdout().lock();

    match ca_init::run(&raw, &mut prompter, &OsEntropy, FilePki::new, &mut stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
