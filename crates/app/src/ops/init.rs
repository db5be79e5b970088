use clap::Args;
use url::Url;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Viewer page share links point at
    #[arg(long)]
    pub link_base: Option<Url>,

    /// IPFS HTTP API add endpoint for uploads (e.g. http://127.0.0.1:5001/api/v0/add)
    #[arg(long)]
    pub upload_url: Option<Url>,

    /// Mirror uploaded ciphertext into this directory and read it back before the network.
    /// Without --upload-url this is the only upload target and links only open on this machine.
    #[arg(long)]
    pub local_store: Option<std::path::PathBuf>,

    /// Write daily log files under the sealshare directory
    #[arg(long)]
    pub file_logging: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("init failed: {0}")]
    Identity(#[from] common::identity::IdentityError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            upload_url: self.upload_url.clone(),
            local_store: self.local_store.clone(),
            file_logging: self.file_logging,
            ..Default::default()
        };
        if let Some(link_base) = &self.link_base {
            config.link_base = link_base.clone();
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let did = common::identity::ShareContext::with_key(state.load_key()?)
            .did()
            .await?;

        let output = format!(
            "Initialized sealshare directory at: {}\n\
             - Key: {}\n\
             - Identity: {}\n\
             - Config: {}\n\
             - Link base: {}\n\
             - Upload endpoint: {}",
            state.app_dir.display(),
            state.key_path.display(),
            did,
            state.config_path.display(),
            state.config.link_base,
            state
                .config
                .upload_url
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_else(|| "none (local store and gateways only)".to_string()),
        );

        Ok(output)
    }
}
