//! Viewer identity and the issuing context
//!
//! Restricted shares are addressed to a DID. The core never authenticates
//! anybody itself: an [`IdentityVerifier`] proves out of band that the
//! viewer controls an identity and reports the DID. Whatever it reports is
//! the only viewer identity the token pipeline will accept.

mod context;

use crate::crypto::{Did, SecretKey};

pub use context::{IdentitySource, ShareContext};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity could not be verified")]
    Unverified,
    #[error("identity verification timed out")]
    TimedOut,
    #[error("identity key error: {0}")]
    Key(#[from] crate::crypto::KeyError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Establishes which identity the viewer controls.
///
/// `challenge` is whatever the verifier needs to start (an email address,
/// a prompt); implementations may take a long time when a human has to act.
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_viewer_identity(&self, challenge: &str) -> Result<Did, IdentityError>;
}

/// Vouches for the `did:key` of a locally held ed25519 key.
///
/// Holding the private key (normally loaded from `key.pem`) is the proof;
/// no round trip to anybody else happens. Use a different verifier when the
/// viewer's identity lives elsewhere.
#[derive(Debug, Clone)]
pub struct LocalKeyVerifier {
    key: SecretKey,
}

impl LocalKeyVerifier {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }
}

#[async_trait::async_trait]
impl IdentityVerifier for LocalKeyVerifier {
    async fn verify_viewer_identity(&self, challenge: &str) -> Result<Did, IdentityError> {
        let did = Did::from_public_key(&self.key.public());
        tracing::debug!(%did, challenge, "viewer identified by local key");
        Ok(did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_key_yields_did_key() {
        let key = SecretKey::generate().unwrap();
        let expected = Did::from_public_key(&key.public());

        let verifier = LocalKeyVerifier::new(key);
        let did = verifier.verify_viewer_identity("view share").await.unwrap();
        assert_eq!(did, expected);
    }

    #[test]
    fn test_timeout_is_unauthorized() {
        assert_eq!(
            crate::error::FailureKind::from(IdentityError::TimedOut),
            crate::error::FailureKind::Unauthorized
        );
    }
}
