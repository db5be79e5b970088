use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use clap::Args;
use common::crypto::Did;
use common::error::ShareError;
use common::identity::{IdentitySource, ShareContext};
use common::share::{share_at, ShareOptions};
use common::token::Expiration;

use crate::state::{AppState, StateError};
use crate::transport::storage_from_config;

/// Encrypt a file, upload the ciphertext and print a share link
#[derive(Args, Debug, Clone)]
pub struct Share {
    /// File to share
    pub path: PathBuf,

    /// Name shown to the viewer (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// MIME type shown to the viewer (guessed from the name by default)
    #[arg(long)]
    pub mime: Option<String>,

    /// Protect the file with a password
    #[arg(long, env = "SEALSHARE_PASSWORD")]
    pub password: Option<String>,

    /// Only this identity (a did:key) may open the share
    #[arg(long)]
    pub audience: Option<Did>,

    /// Seconds until the link expires (defaults to the configured lifetime)
    #[arg(long, conflicts_with = "never_expires")]
    pub ttl: Option<u64>,

    /// Issue a link that never expires
    #[arg(long)]
    pub never_expires: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareOpError {
    #[error("{0}")]
    State(#[from] StateError),
    #[error("could not read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{0}")]
    Share(#[from] ShareError),
}

impl Share {
    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    fn expiration(&self, now: i64, default_ttl: Duration) -> Expiration {
        if self.never_expires {
            return Expiration::Never;
        }
        let ttl = self.ttl.map(Duration::from_secs).unwrap_or(default_ttl);
        Expiration::after(now, ttl)
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Share {
    type Error = ShareOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let plaintext = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ShareOpError::Read(self.path.clone(), e))?;

        let name = self.display_name();
        let mime = self.mime.clone().unwrap_or_else(|| {
            mime_guess::from_path(&name)
                .first_or_octet_stream()
                .to_string()
        });
        let now = chrono::Utc::now().timestamp();
        let expiration = self.expiration(now, state.config.default_ttl());

        let mut options = ShareOptions::new(name)
            .mime(mime)
            .expiration(expiration);
        if let Some(password) = &self.password {
            options = options.password(password.clone());
        }
        if let Some(audience) = &self.audience {
            options = options.audience(audience.clone());
        }

        let share_ctx = ShareContext::new(IdentitySource::KeyFile(state.key_path.clone()));
        let storage = storage_from_config(&state.config, &ctx.http);
        let link = share_at(&share_ctx, &storage, Bytes::from(plaintext), options, now).await?;

        tracing::info!(locator = %link.locator, %expiration, "share created");
        Ok(link.compose(&state.config.link_base).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op() -> Share {
        Share {
            path: PathBuf::from("/tmp/report.pdf"),
            name: None,
            mime: None,
            password: None,
            audience: None,
            ttl: None,
            never_expires: false,
        }
    }

    #[test]
    fn test_display_name_from_path() {
        assert_eq!(op().display_name(), "report.pdf");
        let named = Share {
            name: Some("q3.pdf".to_string()),
            ..op()
        };
        assert_eq!(named.display_name(), "q3.pdf");
    }

    #[test]
    fn test_expiration_choices() {
        let day = Duration::from_secs(86_400);
        assert_eq!(op().expiration(100, day), Expiration::At(86_500));

        let short = Share {
            ttl: Some(60),
            ..op()
        };
        assert_eq!(short.expiration(100, day), Expiration::At(160));

        let forever = Share {
            never_expires: true,
            ..op()
        };
        assert_eq!(forever.expiration(100, day), Expiration::Never);
    }
}
