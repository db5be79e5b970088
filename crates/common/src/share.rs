//! Creating a share: encrypt, upload, sign, compose

use bytes::Bytes;

use crate::crypto::{Did, Engine, KdfProfile};
use crate::error::ShareError;
use crate::identity::ShareContext;
use crate::link::{ShareLink, DEFAULT_FILENAME};
use crate::storage::Storage;
use crate::token::{Expiration, Facts, TokenBuilder};

/// Prefix of the name ciphertext is uploaded under
pub const UPLOAD_PREFIX: &str = "encrypted-";

#[derive(Debug, Clone, Default)]
pub struct ShareOptions {
    pub filename: Option<String>,
    pub mime: Option<String>,
    /// Empty counts as no password
    pub password: Option<String>,
    /// `None` shares with anyone holding the link
    pub audience: Option<Did>,
    /// `None` means one year from now
    pub expiration: Option<Expiration>,
    pub kdf: KdfProfile,
}

impl ShareOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn audience(mut self, audience: Did) -> Self {
        self.audience = Some(audience);
        self
    }

    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn kdf(mut self, kdf: KdfProfile) -> Self {
        self.kdf = kdf;
        self
    }
}

/// Share `plaintext` using the system clock.
pub async fn share(
    ctx: &ShareContext,
    storage: &dyn Storage,
    plaintext: Bytes,
    options: ShareOptions,
) -> Result<ShareLink, ShareError> {
    share_at(ctx, storage, plaintext, options, chrono::Utc::now().timestamp()).await
}

/// Share `plaintext` as of `now` (unix seconds).
///
/// The token's capability is scoped to the locator storage hands back, so
/// it cannot be replayed against other content.
pub async fn share_at(
    ctx: &ShareContext,
    storage: &dyn Storage,
    plaintext: Bytes,
    options: ShareOptions,
    now: i64,
) -> Result<ShareLink, ShareError> {
    let issuer = ctx.identity().await?;
    let filename = options
        .filename
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let mime = options
        .mime
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    let engine = Engine::with_profile(options.kdf)?;
    let password = options.password;
    let sealed = tokio::task::spawn_blocking(move || {
        engine.encrypt(&plaintext, password.as_deref())
    })
    .await??;

    let ciphertext = Bytes::from(sealed.ciphertext.clone());
    let locator = storage
        .upload(ciphertext, &format!("{}{}", UPLOAD_PREFIX, filename))
        .await?;
    tracing::info!(%locator, filename = %filename, "uploaded ciphertext");

    let mut builder = TokenBuilder::new(Facts::from_encryption(sealed))
        .audience(options.audience)
        .scope(&locator);
    if let Some(expiration) = options.expiration {
        builder = builder.expiration(expiration);
    }
    let token = builder.sign(issuer, now)?;

    Ok(ShareLink::new(locator, token)
        .with_filename(filename)
        .with_mime(mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ITERATIONS;
    use crate::link::{ParsedLink, ViewSession, ViewState};
    use crate::storage::MemoryStorage;
    use crate::token::inspect_token;

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn test_share_then_view() {
        let ctx = ShareContext::ephemeral();
        let storage = MemoryStorage::new();
        let link = share_at(
            &ctx,
            &storage,
            Bytes::from_static(b"report"),
            ShareOptions::new("report.txt").mime("text/plain"),
            NOW,
        )
        .await
        .unwrap();

        assert_eq!(storage.len(), 1);
        let summary = inspect_token(&link.token).unwrap();
        assert_eq!(summary.issuer, ctx.did().await.unwrap());
        assert_eq!(summary.capability.scope(), Some(link.locator));
        assert_eq!(summary.expiration, Expiration::default_from(NOW));

        let mut session = ViewSession::new(ParsedLink::Delegated(link));
        session.run(&storage, NOW).await;
        assert_eq!(session.plaintext().unwrap().as_ref(), b"report");
    }

    #[tokio::test]
    async fn test_defaults_and_password() {
        let ctx = ShareContext::ephemeral();
        let storage = MemoryStorage::new();
        let options = ShareOptions::default()
            .password("pw")
            .kdf(KdfProfile::with_iterations(MIN_ITERATIONS));
        let link = share_at(&ctx, &storage, Bytes::from_static(b"x"), options, NOW)
            .await
            .unwrap();

        assert_eq!(link.filename, DEFAULT_FILENAME);
        assert_eq!(link.mime, "application/octet-stream");

        let mut session = ViewSession::new(ParsedLink::Delegated(link));
        assert_eq!(
            session.run(&storage, NOW).await,
            &ViewState::NeedsPassword { failures: 0 }
        );
        session.submit_password("pw").await;
        assert_eq!(session.plaintext().unwrap().as_ref(), b"x");
    }

    #[tokio::test]
    async fn test_empty_password_means_open() {
        let ctx = ShareContext::ephemeral();
        let storage = MemoryStorage::new();
        let link = share_at(
            &ctx,
            &storage,
            Bytes::from_static(b"x"),
            ShareOptions::new("x").password(""),
            NOW,
        )
        .await
        .unwrap();
        assert!(!inspect_token(&link.token).unwrap().password_protected);
    }

    #[tokio::test]
    async fn test_weak_kdf_profile_refused() {
        let ctx = ShareContext::ephemeral();
        let storage = MemoryStorage::new();
        let options = ShareOptions::new("x")
            .password("pw")
            .kdf(KdfProfile::with_iterations(1));
        let result = share_at(&ctx, &storage, Bytes::from_static(b"x"), options, NOW).await;

        assert!(matches!(result, Err(ShareError::Encryption(_))));
        assert!(storage.is_empty());
    }
}
