//! Error types for the bootstrap flow.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::orchestrate::run`].
#[derive(Debug, Error)]
pub enum InitError {
    /// A flag was given without the flag it depends on.
    #[error("flag '--{flag}' requires the '--{required}' flag")]
    RequiredWith {
        /// Flag that was supplied.
        flag: &'static str,
        /// Flag that must accompany it.
        required: &'static str,
    },

    /// A flag value is not one of the accepted names.
    #[error("invalid value '{value}' for flag '--{flag}'; options are {options}")]
    InvalidFlagValue {
        /// Offending flag.
        flag: &'static str,
        /// Value as supplied.
        value: String,
        /// Accepted values, human readable.
        options: &'static str,
    },

    /// Two flags cannot be used together.
    #[error("flag '--{flag}' is incompatible with '--{other}'")]
    IncompatibleFlags {
        /// First flag.
        flag: &'static str,
        /// Second flag.
        other: &'static str,
    },

    /// A password file could not be read.
    #[error("error reading {}: {source}", path.display())]
    FileRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The operating system random number generator failed.
    #[error("secure randomness is unavailable: {0}")]
    RandomnessUnavailable(String),

    /// The operator aborted a prompt or the terminal failed.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Key generation, remote retrieval or persistence failed.
    #[error(transparent)]
    Pki(#[from] ca_pki::Error),
}

impl InitError {
    /// Returns true for errors raised by flag validation, before any
    /// prompt is shown or anything is generated.
    #[must_use]
    pub const fn is_flag_error(&self) -> bool {
        matches!(
            self,
            Self::RequiredWith { .. } | Self::InvalidFlagValue { .. } | Self::IncompatibleFlags { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_with_display() {
        let err = InitError::RequiredWith {
            flag: "root",
            required: "key",
        };
        assert_eq!(err.to_string(), "flag '--root' requires the '--key' flag");
        assert!(err.is_flag_error());
    }

    #[test]
    fn invalid_flag_value_display() {
        let err = InitError::InvalidFlagValue {
            flag: "ra",
            value: "vault".into(),
            options: "StepCAS or CloudCAS",
        };
        assert_eq!(
            err.to_string(),
            "invalid value 'vault' for flag '--ra'; options are StepCAS or CloudCAS"
        );
    }

    #[test]
    fn pki_errors_are_not_flag_errors() {
        let err = InitError::from(ca_pki::Error::Generation("boom".into()));
        assert!(!err.is_flag_error());
        assert_eq!(err.to_string(), "certificate generation failed: boom");
    }
}
