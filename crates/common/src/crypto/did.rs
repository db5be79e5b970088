//! Decentralized identifiers
//!
//! Audiences and issuers are named by DID. Keys we hold ourselves are
//! rendered as `did:key` (multicodec `ed25519-pub` + base58btc multibase);
//! DIDs of any other method are carried as opaque, syntax-checked strings
//! and only ever compared for exact equality.

use std::fmt;
use std::str::FromStr;

use multibase::Base;
use serde::{Deserialize, Serialize};

use super::keys::{PublicKey, PUBLIC_KEY_SIZE};

/// Multicodec varint prefix for an ed25519 public key (0xed)
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];
const DID_KEY_PREFIX: &str = "did:key:";

#[derive(Debug, thiserror::Error)]
pub enum DidError {
    #[error("not a DID: missing 'did:' prefix")]
    MissingPrefix,
    #[error("invalid DID method")]
    InvalidMethod,
    #[error("invalid DID method-specific identifier")]
    InvalidIdentifier,
}

/// A syntactically valid DID (`did:<method>:<method-specific-id>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Render an ed25519 public key as a `did:key`
    pub fn from_public_key(key: &PublicKey) -> Self {
        let mut bytes = Vec::with_capacity(ED25519_MULTICODEC.len() + PUBLIC_KEY_SIZE);
        bytes.extend_from_slice(&ED25519_MULTICODEC);
        bytes.extend_from_slice(&key.to_bytes());
        Did(format!(
            "{}{}",
            DID_KEY_PREFIX,
            multibase::encode(Base::Base58Btc, bytes)
        ))
    }

    /// The DID method, e.g. `key` or `mailto`
    pub fn method(&self) -> &str {
        // validated on construction: "did:" + method + ":" + id
        self.0[4..].split(':').next().unwrap_or_default()
    }

    /// Resolve a `did:key` naming an ed25519 key back to that key.
    ///
    /// Returns `None` for other methods or for `did:key`s that do not decode
    /// to an ed25519 public key.
    pub fn public_key(&self) -> Option<PublicKey> {
        let encoded = self.0.strip_prefix(DID_KEY_PREFIX)?;
        let (base, bytes) = multibase::decode(encoded).ok()?;
        if base != Base::Base58Btc {
            return None;
        }
        let key = bytes.strip_prefix(&ED25519_MULTICODEC[..])?;
        PublicKey::try_from(key).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PublicKey> for Did {
    fn from(key: &PublicKey) -> Self {
        Did::from_public_key(key)
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("did:").ok_or(DidError::MissingPrefix)?;
        let (method, id) = rest.split_once(':').ok_or(DidError::InvalidMethod)?;
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(DidError::InvalidMethod);
        }
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DidError::InvalidIdentifier);
        }
        Ok(Did(s.to_string()))
    }
}

impl TryFrom<String> for Did {
    type Error = DidError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
