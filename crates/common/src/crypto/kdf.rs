//! Key stretching: password + salt → AES key (PBKDF2-HMAC-SHA256)

use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::secret::{Salt, Secret, SECRET_SIZE};

/// Iteration count used when a share does not say otherwise
pub const DEFAULT_ITERATIONS: u32 = 100_000;
/// Fewest iterations a profile may ask for
pub const MIN_ITERATIONS: u32 = 10_000;
/// Most iterations a profile may ask for; bounds the work a hostile token can demand
pub const MAX_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("kdf iterations {0} outside {min}..={max}", min = MIN_ITERATIONS, max = MAX_ITERATIONS)]
pub struct KdfRangeError(pub u32);

/// Parameters of the password derivation.
///
/// Travels with password-protected facts so the viewer always re-derives
/// with the parameters the sharer used. Links issued before the profile was
/// recorded carry none and get [`KdfProfile::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfProfile {
    pub iterations: u32,
}

impl Default for KdfProfile {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfProfile {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn validate(&self) -> Result<(), KdfRangeError> {
        if (MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            Ok(())
        } else {
            Err(KdfRangeError(self.iterations))
        }
    }

    /// Derive a 256-bit key from a password and salt.
    ///
    /// Deterministic: the same `(password, salt, profile)` always yields the
    /// same key. Profiles outside [`MIN_ITERATIONS`]..=[`MAX_ITERATIONS`] are
    /// refused before any work is done.
    pub fn derive(&self, password: &str, salt: &Salt) -> Result<Secret, KdfRangeError> {
        self.validate()?;
        let mut key = [0u8; SECRET_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.bytes(), self.iterations, &mut key);
        let secret = Secret::from(key);
        zeroize::Zeroize::zeroize(&mut key);
        Ok(secret)
    }
}
