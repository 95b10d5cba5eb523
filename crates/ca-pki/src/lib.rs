//! PKI construction for `ca-init`.
#![forbid(unsafe_code)]
//!
//! This crate builds the key material and configuration tree of a new
//! certificate authority: the root and intermediate certificates, the first
//! provisioner, optional SSH signing keys, and the `ca.json` and
//! `defaults.json` files that tie them together.
//!
//! # Example
//!
//! ```no_run
//! use ca_pki::{CasOptions, FilePki, Pki, PkiOption};
//!
//! let mut pki = FilePki::new(
//!     CasOptions::Soft,
//!     vec![
//!         PkiOption::Address(":443".into()),
//!         PkiOption::DnsNames(vec!["ca.example.com".into()]),
//!         PkiOption::Provisioner("admin@example.com".into()),
//!     ],
//! )
//! .unwrap();
//!
//! pki.generate_key_pairs(b"password").unwrap();
//! let root = pki
//!     .generate_root_certificate("Example", "Example", "", b"password")
//!     .unwrap();
//! pki.generate_intermediate_certificate("Example", "Example", "", &root, b"password")
//!     .unwrap();
//! pki.save().unwrap();
//! ```
//!
//! # Modules
//!
//! - [`pki`] - The [`Pki`] trait and its filesystem implementation
//! - [`ca`] - Root and intermediate certificate generation
//! - [`keys`] - Password sealing, provisioner and SSH keys
//! - [`config`] - Serialized authority configuration
//! - [`options`] - Backend and construction options
//! - [`remote`] - Upstream root retrieval
//! - [`validation`] - Certificate validation utilities
//! - [`types`] - Core types (Certificate, `PrivateKey`, etc.)
//! - [`error`] - Error types

pub mod ca;
pub mod config;
pub mod error;
pub mod keys;
pub mod options;
pub mod paths;
pub mod pem;
pub mod pki;
pub mod remote;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use options::{
    CasOptions, CertificateIssuer, CloudCasOptions, DeploymentType, PkiOption, Settings,
    StepCasOptions,
};
pub use paths::PkiPaths;
pub use pki::{FilePki, Pki, SaveSummary};
pub use types::{Certificate, PrivateKey, RootAuthority};
