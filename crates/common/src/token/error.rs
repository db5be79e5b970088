/// Failures of the token verification pipeline, in the order they are checked.
///
/// Messages are deliberately bare categories: a `Tampered` token never says
/// which field was altered, and no variant carries key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed")]
    Malformed,
    #[error("tampered")]
    Tampered,
    #[error("expired")]
    Expired,
    #[error("unauthorized")]
    Unauthorized,
    #[error("failed to encode token")]
    Encode,
}

impl TokenError {
    /// Log the internal reason at debug level and return the opaque error.
    pub(crate) fn malformed(reason: &str) -> Self {
        tracing::debug!(reason, "token rejected as malformed");
        TokenError::Malformed
    }
}
