//! Shared helpers for share-link integration tests
#![allow(dead_code)]

use bytes::Bytes;
use common::crypto::{Did, KdfProfile, MIN_ITERATIONS};
use common::identity::{IdentityError, IdentityVerifier, ShareContext};
use common::link::ShareLink;
use common::share::{share_at, ShareOptions};
use common::storage::MemoryStorage;
use url::Url;

pub const NOW: i64 = 1_700_000_000;
pub const HOUR: i64 = 60 * 60;

/// Route library logs to the test harness; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cheap key stretching so password tests stay fast
pub fn fast_kdf() -> KdfProfile {
    KdfProfile::with_iterations(MIN_ITERATIONS)
}

pub fn base_url() -> Url {
    Url::parse("https://share.example/view").unwrap()
}

/// Share `plaintext` from a fresh issuer into a fresh memory store
pub async fn setup_share(
    plaintext: &'static [u8],
    options: ShareOptions,
) -> (ShareLink, MemoryStorage, ShareContext) {
    init_tracing();
    let ctx = ShareContext::ephemeral();
    let storage = MemoryStorage::new();
    let link = share_at(&ctx, &storage, Bytes::from_static(plaintext), options, NOW)
        .await
        .unwrap();
    (link, storage, ctx)
}

/// Vouches for a fixed identity without any proof
pub struct FixedIdentity(pub Did);

#[async_trait::async_trait]
impl IdentityVerifier for FixedIdentity {
    async fn verify_viewer_identity(&self, _challenge: &str) -> Result<Did, IdentityError> {
        Ok(self.0.clone())
    }
}
