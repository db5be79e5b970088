//! What a viewer or sharer is told when something goes wrong
//!
//! Every failure collapses into one [`FailureKind`] whose message is a
//! human-readable category. Internal detail goes to the log at debug level,
//! never into the message.

use crate::crypto::EncryptionError;
use crate::identity::IdentityError;
use crate::link::LinkError;
use crate::storage::TransportError;
use crate::token::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FailureKind {
    #[error("this link is malformed; ask the sender for a fresh one")]
    Malformed,
    #[error("this link has been tampered with")]
    Tampered,
    #[error("this link has expired")]
    Expired,
    #[error("you are not authorized to view this file")]
    Unauthorized,
    #[error("decryption failed; the password is wrong or the file is corrupted")]
    Decryption,
    #[error("this link is missing required parameters")]
    MissingParameters,
    #[error("the file could not be fetched from storage")]
    Transport,
}

impl FailureKind {
    /// Whether trying again in the same session can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Decryption | FailureKind::Transport)
    }
}

impl From<TokenError> for FailureKind {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Malformed | TokenError::Encode => FailureKind::Malformed,
            TokenError::Tampered => FailureKind::Tampered,
            TokenError::Expired => FailureKind::Expired,
            TokenError::Unauthorized => FailureKind::Unauthorized,
        }
    }
}

impl From<LinkError> for FailureKind {
    fn from(_: LinkError) -> Self {
        FailureKind::MissingParameters
    }
}

impl From<TransportError> for FailureKind {
    fn from(error: TransportError) -> Self {
        tracing::debug!(%error, "transport failure");
        FailureKind::Transport
    }
}

impl From<EncryptionError> for FailureKind {
    fn from(_: EncryptionError) -> Self {
        FailureKind::Decryption
    }
}

impl From<IdentityError> for FailureKind {
    fn from(error: IdentityError) -> Self {
        tracing::debug!(%error, "identity challenge failed");
        FailureKind::Unauthorized
    }
}

/// Failures while creating a share
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("encryption failed: {0}")]
    Encryption(#[from] EncryptionError),
    #[error("upload failed: {0}")]
    Transport(#[from] TransportError),
    #[error("could not sign token: {0}")]
    Token(#[from] TokenError),
    #[error("issuer identity unavailable: {0}")]
    Identity(#[from] IdentityError),
    #[error("encryption task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_categories() {
        for kind in [
            FailureKind::Malformed,
            FailureKind::Tampered,
            FailureKind::Expired,
            FailureKind::Unauthorized,
            FailureKind::Decryption,
            FailureKind::MissingParameters,
            FailureKind::Transport,
        ] {
            let message = kind.to_string();
            assert!(!message.is_empty());
            assert!(!message.contains("signature"));
            assert!(!message.contains("key"));
        }
    }

    #[test]
    fn test_token_errors_map_one_to_one() {
        assert_eq!(FailureKind::from(TokenError::Tampered), FailureKind::Tampered);
        assert_eq!(FailureKind::from(TokenError::Expired), FailureKind::Expired);
        assert_eq!(
            FailureKind::from(TokenError::Unauthorized),
            FailureKind::Unauthorized
        );
        assert_eq!(FailureKind::from(TokenError::Malformed), FailureKind::Malformed);
    }

    #[test]
    fn test_only_decryption_and_transport_are_retryable() {
        assert!(FailureKind::Decryption.is_retryable());
        assert!(FailureKind::Transport.is_retryable());
        assert!(!FailureKind::Tampered.is_retryable());
        assert!(!FailureKind::Expired.is_retryable());
    }
}
