//! Encryption engine: AES-256-GCM over a whole file
//!
//! Two key sources are supported:
//! - **Open**: a fresh random key, reported back so it can be placed in a token
//! - **Password**: a key stretched from a password and a fresh salt; only the
//!   salt is reported, the key is dropped as soon as the payload is sealed
//!
//! The ciphertext is the bare AEAD output (`encrypted || tag`). The nonce is
//! not prefixed; it travels out of band next to the key material.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::kdf::{KdfProfile, KdfRangeError};
use super::secret::{Iv, Salt, Secret, SecretError};

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// Wrong key, wrong iv, wrong password or corrupted ciphertext.
    /// Deliberately one variant: callers cannot tell these apart.
    #[error("decryption failed")]
    Decryption,
    #[error("encryption failed")]
    Encryption,
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Kdf(#[from] KdfRangeError),
}

/// Where the key for a sealed payload comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Random key, must be handed to the viewer
    Open { key: Secret },
    /// Password-derived key; the viewer re-derives it from the password
    Password { salt: Salt, kdf: KdfProfile },
}

/// Output of a single [`Engine::encrypt`] call
#[derive(Debug, Clone)]
pub struct EncryptionResult {
    pub ciphertext: Vec<u8>,
    pub iv: Iv,
    pub material: KeyMaterial,
}

impl EncryptionResult {
    /// The raw key, present only when no password was supplied
    pub fn key(&self) -> Option<&Secret> {
        match &self.material {
            KeyMaterial::Open { key } => Some(key),
            KeyMaterial::Password { .. } => None,
        }
    }

    /// The salt, present only when a password was supplied
    pub fn salt(&self) -> Option<&Salt> {
        match &self.material {
            KeyMaterial::Open { .. } => None,
            KeyMaterial::Password { salt, .. } => Some(salt),
        }
    }

    pub fn password_protected(&self) -> bool {
        matches!(self.material, KeyMaterial::Password { .. })
    }
}

/// Seals and opens file payloads.
///
/// Holds the key-stretching profile used for new password-protected
/// payloads. Decryption always uses the profile it is handed, so an engine
/// with a non-default profile can still open older shares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    profile: KdfProfile,
}

impl Engine {
    /// Engine sealing new password shares with `profile`; out-of-range profiles are refused.
    pub fn with_profile(profile: KdfProfile) -> Result<Self, EncryptionError> {
        profile.validate()?;
        Ok(Self { profile })
    }

    pub fn profile(&self) -> KdfProfile {
        self.profile
    }

    /// Encrypt `plaintext`, with a random key or with a key derived from `password`.
    ///
    /// An empty password counts as no password. A fresh iv is drawn on every
    /// call, and a fresh key or salt alongside it.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        password: Option<&str>,
    ) -> Result<EncryptionResult, EncryptionError> {
        let iv = Iv::generate()?;
        let (key, material) = match password.filter(|p| !p.is_empty()) {
            Some(password) => {
                let salt = Salt::generate()?;
                let key = self.profile.derive(password, &salt)?;
                (
                    key,
                    KeyMaterial::Password {
                        salt,
                        kdf: self.profile,
                    },
                )
            }
            None => {
                let key = Secret::generate()?;
                (key.clone(), KeyMaterial::Open { key })
            }
        };

        let ciphertext = cipher(&key)
            .encrypt(Nonce::from_slice(iv.bytes()), plaintext)
            .map_err(|_| EncryptionError::Encryption)?;

        tracing::debug!(
            size = plaintext.len(),
            password_protected = matches!(material, KeyMaterial::Password { .. }),
            "sealed payload"
        );

        Ok(EncryptionResult {
            ciphertext,
            iv,
            material,
        })
    }
}

fn cipher(key: &Secret) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()))
}

/// Encrypt with the default key-stretching profile.
pub fn encrypt(plaintext: &[u8], password: Option<&str>) -> Result<EncryptionResult, EncryptionError> {
    Engine::default().encrypt(plaintext, password)
}

/// Open a payload with its key and iv.
///
/// Fails with [`EncryptionError::Decryption`] whenever the tag does not
/// verify; no partial plaintext is ever returned.
pub fn decrypt(ciphertext: &[u8], key: &Secret, iv: &Iv) -> Result<Vec<u8>, EncryptionError> {
    cipher(key)
        .decrypt(Nonce::from_slice(iv.bytes()), ciphertext)
        .map_err(|_| EncryptionError::Decryption)
}

/// Re-derive the key from `(password, salt)` with the default profile and open the payload.
pub fn decrypt_with_password(
    ciphertext: &[u8],
    password: &str,
    salt: &Salt,
    iv: &Iv,
) -> Result<Vec<u8>, EncryptionError> {
    decrypt_with_profile(ciphertext, password, salt, &KdfProfile::default(), iv)
}

/// Like [`decrypt_with_password`], with explicit derivation parameters.
pub fn decrypt_with_profile(
    ciphertext: &[u8],
    password: &str,
    salt: &Salt,
    profile: &KdfProfile,
    iv: &Iv,
) -> Result<Vec<u8>, EncryptionError> {
    let key = profile.derive(password, salt)?;
    decrypt(ciphertext, &key, iv)
}

#[cfg(test)]
mod test {
    use super::*;

    fn fast_engine() -> Engine {
        Engine::with_profile(KdfProfile::with_iterations(crate::crypto::MIN_ITERATIONS)).unwrap()
    }

    #[test]
    fn test_open_roundtrip() {
        let data = b"hello world, this is a test message for encryption";
        let sealed = encrypt(data, None).unwrap();

        assert!(!sealed.password_protected());
        assert!(sealed.salt().is_none());
        let key = sealed.key().unwrap();

        let opened = decrypt(&sealed.ciphertext, key, &sealed.iv).unwrap();
        assert_eq!(opened, data.to_vec());
    }

    #[test]
    fn test_password_roundtrip_default_profile() {
        let data = b"0123456789";
        let sealed = encrypt(data, Some("hunter2")).unwrap();

        assert!(sealed.password_protected());
        assert!(sealed.key().is_none());
        let salt = sealed.salt().unwrap();

        let opened = decrypt_with_password(&sealed.ciphertext, "hunter2", salt, &sealed.iv).unwrap();
        assert_eq!(opened, data.to_vec());
    }

    #[test]
    fn test_wrong_password_fails() {
        let sealed = fast_engine().encrypt(b"secret stuff", Some("right")).unwrap();
        let salt = *sealed.salt().unwrap();
        let profile = fast_engine().profile();

        let result = decrypt_with_profile(&sealed.ciphertext, "wrong", &salt, &profile, &sealed.iv);
        assert!(matches!(result, Err(EncryptionError::Decryption)));
    }

    #[test]
    fn test_empty_password_means_open() {
        let sealed = fast_engine().encrypt(b"data", Some("")).unwrap();
        assert!(!sealed.password_protected());
        assert!(sealed.key().is_some());
    }

    #[test]
    fn test_fresh_iv_and_key_per_call() {
        let a = encrypt(b"same", None).unwrap();
        let b = encrypt(b"same", None).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.key(), b.key());
        assert_ne!(a.ciphertext, b.ciphertext);

        let c = fast_engine().encrypt(b"same", Some("pw")).unwrap();
        let d = fast_engine().encrypt(b"same", Some("pw")).unwrap();
        assert_ne!(c.iv, d.iv);
        assert_ne!(c.salt(), d.salt());
    }

    #[test]
    fn test_bit_flip_detected() {
        let sealed = encrypt(b"test data for integrity check", None).unwrap();
        let key = sealed.key().unwrap();

        for byte in 0..sealed.ciphertext.len() {
            let mut corrupted = sealed.ciphertext.clone();
            corrupted[byte] ^= 0x01;
            assert!(matches!(
                decrypt(&corrupted, key, &sealed.iv),
                Err(EncryptionError::Decryption)
            ));
        }
    }

    #[test]
    fn test_wrong_iv_fails() {
        let sealed = encrypt(b"payload", None).unwrap();
        let other_iv = Iv::generate().unwrap();
        assert!(decrypt(&sealed.ciphertext, sealed.key().unwrap(), &other_iv).is_err());
    }

    #[test]
    fn test_empty_data_encryption() {
        let sealed = encrypt(b"", None).unwrap();
        let opened = decrypt(&sealed.ciphertext, sealed.key().unwrap(), &sealed.iv).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn test_out_of_range_profile_refused() {
        for iterations in [0, 1, u32::MAX] {
            let profile = KdfProfile::with_iterations(iterations);
            assert!(matches!(
                Engine::with_profile(profile),
                Err(EncryptionError::Kdf(_))
            ));

            let sealed = fast_engine().encrypt(b"data", Some("pw")).unwrap();
            let salt = *sealed.salt().unwrap();
            assert!(matches!(
                decrypt_with_profile(&sealed.ciphertext, "pw", &salt, &profile, &sealed.iv),
                Err(EncryptionError::Kdf(_))
            ));
        }
    }
}
