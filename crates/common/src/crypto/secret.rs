//! Symmetric key material for content encryption
//!
//! Every uploaded file is sealed with AES-256-GCM under its own key:
//! - **`Secret`**: the 256-bit key, either random or stretched from a password
//! - **`Iv`**: the 96-bit nonce, fresh for every encryption
//! - **`Salt`**: the 128-bit salt fed to the key stretcher
//!
//! All three travel inside a token as standard base64 strings.

use std::ops::Deref;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zeroize::Zeroize;

/// Size of AES-GCM nonce in bytes
pub const IV_SIZE: usize = 12;
/// Size of AES-256 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the key-stretching salt in bytes
pub const SALT_SIZE: usize = 16;

/// Errors that can occur while handling raw key material
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

fn random_bytes<const N: usize>() -> Result<[u8; N], SecretError> {
    let mut buff = [0; N];
    getrandom::getrandom(&mut buff)
        .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
    Ok(buff)
}

fn array_from_slice<const N: usize>(what: &str, data: &[u8]) -> Result<[u8; N], SecretError> {
    if data.len() != N {
        return Err(anyhow::anyhow!(
            "invalid {} size, expected {}, got {}",
            what,
            N,
            data.len()
        )
        .into());
    }
    let mut buff = [0; N];
    buff.copy_from_slice(data);
    Ok(buff)
}

fn array_from_base64<const N: usize>(what: &str, encoded: &str) -> Result<[u8; N], SecretError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| anyhow::anyhow!("{} is not valid base64", what))?;
    array_from_slice(what, &bytes)
}

/// A 256-bit AES-GCM key
///
/// Zeroized on drop, and never printed by `Debug`.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate()?;
/// let encoded = secret.to_base64();
/// let recovered = Secret::from_base64(&encoded)?;
/// assert_eq!(secret, recovered);
/// ```
#[derive(PartialEq, Eq, Clone)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        Ok(Self(random_bytes()?))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        Ok(Self(array_from_slice("secret", data)?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        Ok(Self(array_from_base64("secret", encoded)?))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// A 96-bit AES-GCM nonce
///
/// Carried next to the ciphertext (in the token facts), never prefixed to it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Iv([u8; IV_SIZE]);

impl From<[u8; IV_SIZE]> for Iv {
    fn from(bytes: [u8; IV_SIZE]) -> Self {
        Iv(bytes)
    }
}

impl Iv {
    pub fn generate() -> Result<Self, SecretError> {
        Ok(Self(random_bytes()?))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        Ok(Self(array_from_slice("iv", data)?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        Ok(Self(array_from_base64("iv", encoded)?))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Random salt for password key stretching
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Salt([u8; SALT_SIZE]);

impl From<[u8; SALT_SIZE]> for Salt {
    fn from(bytes: [u8; SALT_SIZE]) -> Self {
        Salt(bytes)
    }
}

impl Salt {
    pub fn generate() -> Result<Self, SecretError> {
        Ok(Self(random_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        Ok(Self(array_from_base64("salt", encoded)?))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}
