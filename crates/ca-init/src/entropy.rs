//! Preflight check for a cryptographically secure random source.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::InitError;

/// Bytes read by the preflight check.
const PROBE_SIZE: usize = 64;

/// Checks that secure randomness can be read before anything is generated.
pub trait EntropyProbe {
    /// Returns an error if the random source is unusable.
    fn check(&self) -> Result<(), InitError>;
}

/// Probe backed by the operating system generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropyProbe for OsEntropy {
    fn check(&self) -> Result<(), InitError> {
        let mut buf = [0u8; PROBE_SIZE];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| InitError::RandomnessUnavailable(format!("read failed: {e}")))
    }
}
