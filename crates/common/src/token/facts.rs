//! Facts: the decryption parameters a token carries
//!
//! In memory the facts are a tagged variant, so "key xor salt" cannot be
//! violated. On the wire they keep the flat shape older viewers understand:
//!
//! ```text
//! { iv, key?, salt?, passwordProtected?, restricted?, kdf? }
//! ```

use serde::{Deserialize, Serialize};

use super::error::TokenError;
use crate::crypto::{
    decrypt, decrypt_with_profile, Did, EncryptionError, EncryptionResult, Iv, KdfProfile,
    KeyMaterial, Salt, Secret,
};

/// Everything needed to reverse one encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts {
    pub iv: Iv,
    pub material: KeyMaterial,
}

impl Facts {
    pub fn open(iv: Iv, key: Secret) -> Self {
        Self {
            iv,
            material: KeyMaterial::Open { key },
        }
    }

    pub fn password(iv: Iv, salt: Salt, kdf: KdfProfile) -> Self {
        Self {
            iv,
            material: KeyMaterial::Password { salt, kdf },
        }
    }

    /// Take over the key material of a fresh encryption.
    pub fn from_encryption(result: EncryptionResult) -> Self {
        Self {
            iv: result.iv,
            material: result.material,
        }
    }

    pub fn password_protected(&self) -> bool {
        matches!(self.material, KeyMaterial::Password { .. })
    }

    /// Open a ciphertext with the key carried in the facts.
    ///
    /// Password-protected facts carry no key; this fails with
    /// [`EncryptionError::Decryption`] for them.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        match &self.material {
            KeyMaterial::Open { key } => decrypt(ciphertext, key, &self.iv),
            KeyMaterial::Password { .. } => Err(EncryptionError::Decryption),
        }
    }

    /// Re-derive the key from `password` with the recorded profile and open the ciphertext.
    pub fn decrypt_with_password(
        &self,
        ciphertext: &[u8],
        password: &str,
    ) -> Result<Vec<u8>, EncryptionError> {
        match &self.material {
            KeyMaterial::Password { salt, kdf } => {
                decrypt_with_profile(ciphertext, password, salt, kdf, &self.iv)
            }
            KeyMaterial::Open { key } => decrypt(ciphertext, key, &self.iv),
        }
    }
}

/// Verified facts, together with who they are addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Anyone holding the link may use the facts
    Open(Facts),
    /// Only the named audience may use the facts
    Restricted { audience: Did, facts: Facts },
}

impl Grant {
    pub fn facts(&self) -> &Facts {
        match self {
            Grant::Open(facts) => facts,
            Grant::Restricted { facts, .. } => facts,
        }
    }

    pub fn into_facts(self) -> Facts {
        match self {
            Grant::Open(facts) => facts,
            Grant::Restricted { facts, .. } => facts,
        }
    }

    pub fn restricted(&self) -> bool {
        matches!(self, Grant::Restricted { .. })
    }

    pub fn password_protected(&self) -> bool {
        self.facts().password_protected()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FactsWire {
    iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    password_protected: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    restricted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kdf: Option<KdfProfile>,
}

impl FactsWire {
    pub(crate) fn new(facts: &Facts, restricted: bool) -> Self {
        let (key, salt, kdf) = match &facts.material {
            KeyMaterial::Open { key } => (Some(key.to_base64()), None, None),
            KeyMaterial::Password { salt, kdf } => (None, Some(salt.to_base64()), Some(*kdf)),
        };
        Self {
            iv: facts.iv.to_base64(),
            password_protected: salt.is_some(),
            key,
            salt,
            restricted,
            kdf,
        }
    }

    pub(crate) fn restricted(&self) -> bool {
        self.restricted
    }

    /// Check the wire invariants and lift into typed facts.
    pub(crate) fn into_facts(self) -> Result<Facts, TokenError> {
        let iv = Iv::from_base64(&self.iv).map_err(|_| TokenError::malformed("iv"))?;
        match (self.key, self.salt) {
            (Some(key), None) => {
                if self.password_protected || self.kdf.is_some() {
                    return Err(TokenError::malformed("open facts flagged as password protected"));
                }
                let key = Secret::from_base64(&key).map_err(|_| TokenError::malformed("key"))?;
                Ok(Facts::open(iv, key))
            }
            (None, Some(salt)) => {
                if !self.password_protected {
                    return Err(TokenError::malformed("salted facts not flagged as password protected"));
                }
                let salt = Salt::from_base64(&salt).map_err(|_| TokenError::malformed("salt"))?;
                let kdf = self.kdf.unwrap_or_default();
                kdf.validate().map_err(|_| TokenError::malformed("kdf iterations"))?;
                Ok(Facts::password(iv, salt, kdf))
            }
            _ => Err(TokenError::malformed("facts must carry exactly one of key or salt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{MAX_ITERATIONS, MIN_ITERATIONS};

    fn open_facts() -> Facts {
        Facts::open(Iv::generate().unwrap(), Secret::generate().unwrap())
    }

    #[test]
    fn test_wire_shape_open() {
        let wire = FactsWire::new(&open_facts(), false);
        let json = serde_json::to_value(&wire).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("iv"));
        assert!(obj.contains_key("key"));
        assert!(!obj.contains_key("salt"));
        assert!(!obj.contains_key("passwordProtected"));
        assert!(!obj.contains_key("restricted"));
    }

    #[test]
    fn test_wire_shape_password_restricted() {
        let facts = Facts::password(
            Iv::generate().unwrap(),
            Salt::generate().unwrap(),
            KdfProfile::default(),
        );
        let wire = FactsWire::new(&facts, true);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["passwordProtected"], true);
        assert_eq!(json["restricted"], true);
        assert_eq!(json["kdf"]["iterations"], 100_000);
        assert!(json.get("key").is_none());

        assert_eq!(wire.into_facts().unwrap(), facts);
    }

    #[test]
    fn test_missing_kdf_means_default() {
        let salt = Salt::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let json = serde_json::json!({
            "iv": iv.to_base64(),
            "salt": salt.to_base64(),
            "passwordProtected": true,
        });
        let wire: FactsWire = serde_json::from_value(json).unwrap();
        let facts = wire.into_facts().unwrap();
        assert_eq!(facts, Facts::password(iv, salt, KdfProfile::default()));
    }

    #[test]
    fn test_key_and_salt_together_rejected() {
        let facts = open_facts();
        let mut wire = FactsWire::new(&facts, false);
        wire.salt = Some(Salt::generate().unwrap().to_base64());
        wire.password_protected = true;
        assert_eq!(wire.into_facts(), Err(TokenError::Malformed));
    }

    #[test]
    fn test_neither_key_nor_salt_rejected() {
        let mut wire = FactsWire::new(&open_facts(), false);
        wire.key = None;
        assert_eq!(wire.into_facts(), Err(TokenError::Malformed));
    }

    #[test]
    fn test_kdf_iterations_out_of_range_rejected() {
        let facts = Facts::password(
            Iv::generate().unwrap(),
            Salt::generate().unwrap(),
            KdfProfile::default(),
        );
        for iterations in [0, 1, MIN_ITERATIONS - 1, MAX_ITERATIONS + 1, u32::MAX] {
            let mut wire = FactsWire::new(&facts, false);
            wire.kdf = Some(KdfProfile::with_iterations(iterations));
            assert_eq!(wire.into_facts(), Err(TokenError::Malformed));
        }

        for iterations in [MIN_ITERATIONS, MAX_ITERATIONS] {
            let mut wire = FactsWire::new(&facts, false);
            wire.kdf = Some(KdfProfile::with_iterations(iterations));
            assert!(wire.into_facts().is_ok());
        }
    }

    #[test]
    fn test_flag_mismatch_rejected() {
        let mut wire = FactsWire::new(&open_facts(), false);
        wire.password_protected = true;
        assert_eq!(wire.into_facts(), Err(TokenError::Malformed));
    }

    #[test]
    fn test_password_facts_need_password() {
        let sealed = crate::crypto::Engine::with_profile(KdfProfile::with_iterations(MIN_ITERATIONS))
            .unwrap()
            .encrypt(b"abc", Some("pw"))
            .unwrap();
        let ciphertext = sealed.ciphertext.clone();
        let facts = Facts::from_encryption(sealed);

        assert!(facts.decrypt(&ciphertext).is_err());
        assert_eq!(facts.decrypt_with_password(&ciphertext, "pw").unwrap(), b"abc");
    }
}
