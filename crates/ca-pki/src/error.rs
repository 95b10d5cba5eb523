//! PKI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for PKI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PKI error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Key or certificate generation failed.
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// Certificate or key parsing failed.
    #[error("certificate parsing failed: {0}")]
    Parse(String),

    /// Certificate or option validation failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    /// A file could not be read.
    #[error("error reading {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("error writing {}: {source}", path.display())]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Key encryption or decryption failed.
    #[error("key encryption failed: {0}")]
    Encryption(String),

    /// Configuration could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The remote authority could not be reached or returned bad data.
    #[error("remote authority error: {0}")]
    Remote(String),

    /// The requested backend or deployment is not supported by this library.
    #[error("unsupported: {0}")]
    Unsupported(String),
}
