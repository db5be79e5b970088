//! Storage transport contract
//!
//! The core never decides how ciphertext reaches durable storage; it only
//! needs something that turns bytes into a content locator and back.
//! Implementations here are the in-memory store used by tests and local
//! tooling, and an ordered fallback over several stores. HTTP gateways
//! live with the CLI.

mod fallback;
mod memory;

use bytes::Bytes;
use cid::Cid;
use multihash::Multihash;
use sha2::{Digest, Sha256};

pub use fallback::FallbackStorage;
pub use memory::MemoryStorage;

/// Multicodec for raw binary content
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for sha2-256
pub const SHA2_256_CODE: u64 = 0x12;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("content not found: {0}")]
    NotFound(Cid),
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("every storage endpoint failed")]
    Exhausted,
}

/// Moves ciphertext to and from a content-addressed store.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Store `bytes` under the display `name`, returning their locator.
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError>;

    /// Fetch the bytes stored at `locator`.
    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError>;
}

/// CIDv1 (raw codec, sha2-256) of `bytes`
pub fn locator_for(bytes: &[u8]) -> Cid {
    let digest = Sha256::digest(bytes);
    // a 32-byte digest always fits the 64-byte multihash
    let hash = Multihash::<64>::wrap(SHA2_256_CODE, &digest).unwrap_or_default();
    Cid::new_v1(RAW_CODEC, hash)
}
