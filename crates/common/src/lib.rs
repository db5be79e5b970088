/**
 * Cryptographic types and operations.
 *  - Ed25519 identities and did:key
 *  - AES-256-GCM file encryption
 *  - PBKDF2 password key stretching
 */
pub mod crypto;
/**
 * What viewers and sharers are told
 *  when something fails.
 */
pub mod error;
/**
 * Viewer identity verification and the
 *  process-wide issuer context.
 */
pub mod identity;
/**
 * Share URLs, legacy links, and the
 *  viewer state machine.
 */
pub mod link;
/**
 * The producer pipeline: encrypt, upload,
 *  sign, compose.
 */
pub mod share;
/**
 * Content-addressed storage transport.
 */
pub mod storage;
/**
 * Signed delegation tokens and their
 *  ordered verification pipeline.
 */
pub mod token;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::build_info;
    pub use crate::crypto::{Did, Engine, KdfProfile, PublicKey, SecretKey};
    pub use crate::error::{FailureKind, ShareError};
    pub use crate::identity::{IdentitySource, IdentityVerifier, LocalKeyVerifier, ShareContext};
    pub use crate::link::{LegacyLink, ParsedLink, ShareLink, ViewSession, ViewState};
    pub use crate::share::{share, share_at, ShareOptions};
    pub use crate::storage::{FallbackStorage, MemoryStorage, Storage, TransportError};
    pub use crate::token::{
        extract_token, inspect_token, Audience, EncodedToken, Expiration, Facts, Grant, TokenError,
    };
    pub use crate::version::BuildInfo;
    pub use cid::Cid;
}
