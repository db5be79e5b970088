use std::path::{Path, PathBuf};

use clap::Args;
use common::error::FailureKind;
use common::identity::LocalKeyVerifier;
use common::link::{ParsedLink, Shown, ViewSession, ViewState};
use tokio::io::AsyncBufReadExt;

use crate::state::{AppConfig, AppState};
use crate::transport::storage_from_config;

/// Wrong passwords allowed at the prompt before giving up
const MAX_PASSWORD_ATTEMPTS: u32 = 3;

/// Fetch, verify and decrypt a share link
#[derive(Args, Debug, Clone)]
pub struct View {
    /// The share link
    pub link: String,

    /// Where to write the plaintext (defaults to the shared file name)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Password for protected shares; prompted for when absent
    #[arg(long, env = "SEALSHARE_PASSWORD")]
    pub password: Option<String>,

    /// Text signed when proving identity for restricted shares
    #[arg(long, default_value = "sealshare view")]
    pub challenge: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("{0}")]
    Failed(FailureKind),
    #[error("this share is restricted; run 'sealshare init' to create an identity")]
    NoIdentity,
    #[error("{0}")]
    State(#[from] crate::state::StateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FailureKind> for ViewError {
    fn from(kind: FailureKind) -> Self {
        ViewError::Failed(kind)
    }
}

/// Keep only the final path component of a name chosen by the sharer.
fn safe_file_name(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(common::link::DEFAULT_FILENAME))
}

async fn prompt_password(failures: u32) -> Result<String, std::io::Error> {
    if failures > 0 {
        eprintln!("Wrong password ({} failed)", failures);
    }
    eprint!("Password: ");
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

impl View {
    async fn next_password(&self, failures: u32) -> Result<String, ViewError> {
        if failures >= MAX_PASSWORD_ATTEMPTS {
            return Err(FailureKind::Decryption.into());
        }
        match &self.password {
            Some(password) if failures == 0 => Ok(password.clone()),
            Some(_) => Err(FailureKind::Decryption.into()),
            None => Ok(prompt_password(failures).await?),
        }
    }

    async fn write(&self, shown: &Shown) -> Result<String, ViewError> {
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| safe_file_name(&shown.filename));
        tokio::fs::write(&path, &shown.plaintext).await?;
        Ok(format!(
            "Saved {} ({}, {} bytes) to {}",
            shown.filename,
            shown.mime,
            shown.plaintext.len(),
            path.display()
        ))
    }
}

#[async_trait::async_trait]
impl crate::op::Op for View {
    type Error = ViewError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let parsed: ParsedLink = self.link.parse().map_err(FailureKind::from)?;

        // viewing works without init; only restricted shares need the key
        let state = AppState::load(ctx.config_path.clone()).ok();
        let config = state
            .as_ref()
            .map(|state| state.config.clone())
            .unwrap_or_else(AppConfig::default);
        let storage = storage_from_config(&config, &ctx.http);

        let mut session = ViewSession::new(parsed);
        session
            .run(&storage, chrono::Utc::now().timestamp())
            .await;

        loop {
            match session.state().clone() {
                ViewState::NeedsIdentityChallenge => {
                    let state = state.as_ref().ok_or(ViewError::NoIdentity)?;
                    let verifier = LocalKeyVerifier::new(state.load_key()?);
                    session
                        .answer_identity_challenge(
                            &verifier,
                            &self.challenge,
                            config.identity_timeout(),
                        )
                        .await;
                }
                ViewState::NeedsPassword { failures } => {
                    let password = self.next_password(failures).await?;
                    session.submit_password(&password).await;
                }
                ViewState::Ready => {
                    session.open();
                }
                ViewState::Shown(shown) => return self.write(&shown).await,
                ViewState::Failed(kind) => return Err(kind.into()),
                ViewState::Fetching | ViewState::TokenVerifying | ViewState::Decrypting => {
                    return Err(FailureKind::Malformed.into())
                }
            }
        }
    }
}
