//! Cryptographic primitives for sealshare
//!
//! - **Identity**: Ed25519 keypairs sign delegation tokens; public keys double
//!   as `did:key` audiences
//! - **Encryption**: AES-256-GCM with a fresh 96-bit iv per file
//! - **Key stretching**: PBKDF2-HMAC-SHA256 (100k rounds by default) turns a
//!   share password into the file key
//!
//! # Security Model
//!
//! The engine owns key material only until it is written into a token's
//! facts. From then on the token (and therefore the share URL) is the sole
//! carrier; nothing here caches keys. Decryption failures are a single
//! opaque [`EncryptionError::Decryption`] so a wrong password is
//! indistinguishable from corrupted data.

mod did;
mod engine;
mod kdf;
mod keys;
mod secret;

pub use did::{Did, DidError};
pub use engine::{
    decrypt, decrypt_with_password, decrypt_with_profile, encrypt, Engine, EncryptionError,
    EncryptionResult, KeyMaterial,
};
pub use kdf::{KdfProfile, KdfRangeError, DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS};
pub use keys::{
    KeyError, PublicKey, SecretKey, Signature, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
pub use secret::{Iv, Salt, Secret, SecretError, IV_SIZE, SALT_SIZE, SECRET_SIZE};
