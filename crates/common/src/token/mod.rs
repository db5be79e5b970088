//! Delegation tokens
//!
//! A token is a self-contained, signed authorization for one share. It
//! names its issuer, an audience (anyone, or one DID), a read capability
//! scoped to the ciphertext locator, an expiration, and the facts needed to
//! decrypt. There is no server-side state: everything a viewer needs to
//! decide is in the token and verifiable from it.
//!
//! Verification is strictly ordered (see [`verify`]): structure, signature,
//! expiration, audience. Each step has its own error kind.

mod claims;
mod codec;
mod error;
mod facts;
pub mod verify;

pub use claims::{Audience, Capability, Expiration, DEFAULT_TTL, SHARE_READ};
pub use codec::{create_token, EncodedToken, TokenBuilder, ENVELOPE_HEADER_SIZE, TOKEN_VERSION};
pub use error::TokenError;
pub use facts::{Facts, Grant};
pub use verify::{
    extract_token, extract_token_at, inspect_token, AuthorizedToken, CurrentToken, SignedToken,
    TokenSummary, UnverifiedToken,
};
