//! Share links and the viewer flow
//!
//! A share link is one URL carrying everything a recipient needs: where
//! the ciphertext lives, the signed token holding its decryption facts,
//! and how to present the plaintext. Two shapes are accepted:
//!
//! ```text
//! ?cid=<locator>&d=<token>&filename=<name>&type=<mime>
//! ?cid=<locator>&key=<key>&iv=<iv>&proof=<proof>&exp=<unix secs>&filename=..&type=..
//! ```
//!
//! The second is the legacy form: the key travels in the clear and nothing
//! is signed. It is still understood so links already handed out keep
//! working, but new links are always the first form.

mod legacy;
mod share_link;
pub mod viewer;

pub use legacy::LegacyLink;
pub use share_link::{ParsedLink, ShareLink, DEFAULT_FILENAME, DEFAULT_MIME};
pub use viewer::{password_delay, Shown, ViewSession, ViewState};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The URL lacks a locator or token, or one of them does not decode
    #[error("missing parameters")]
    MissingParameters,
}

impl LinkError {
    pub(crate) fn missing(parameter: &str) -> Self {
        tracing::debug!(parameter, "share link rejected");
        LinkError::MissingParameters
    }
}
