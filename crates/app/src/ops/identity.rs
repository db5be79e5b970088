use clap::Args;

use common::identity::{IdentityError, ShareContext};

use crate::state::{AppState, StateError};

/// Print the did:key this installation signs shares with
#[derive(Args, Debug, Clone)]
pub struct Identity;

#[derive(Debug, thiserror::Error)]
pub enum IdentityOpError {
    #[error("{0}")]
    State(#[from] StateError),
    #[error("{0}")]
    Identity(#[from] IdentityError),
}

#[async_trait::async_trait]
impl crate::op::Op for Identity {
    type Error = IdentityOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let did = ShareContext::with_key(state.load_key()?).did().await?;
        Ok(did.to_string())
    }
}
