use std::path::PathBuf;

use tokio::sync::OnceCell;

use super::IdentityError;
use crate::crypto::{Did, SecretKey};

/// Where the issuer identity comes from
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// A fresh key per process
    Ephemeral,
    /// A PEM key file, created on first use if missing
    KeyFile(PathBuf),
    /// A key the caller already holds
    Key(SecretKey),
}

/// Process-wide handle to the issuer identity
///
/// Created once at start-up and passed by reference to every share
/// operation. The key is materialised lazily and at most once: concurrent
/// first callers all wait on the same initialisation and see the same key.
#[derive(Debug)]
pub struct ShareContext {
    source: IdentitySource,
    identity: OnceCell<SecretKey>,
}

impl ShareContext {
    pub fn new(source: IdentitySource) -> Self {
        Self {
            source,
            identity: OnceCell::new(),
        }
    }

    pub fn ephemeral() -> Self {
        Self::new(IdentitySource::Ephemeral)
    }

    pub fn with_key(key: SecretKey) -> Self {
        Self::new(IdentitySource::Key(key))
    }

    /// The issuer key, initialising it on first call.
    pub async fn identity(&self) -> Result<&SecretKey, IdentityError> {
        self.identity
            .get_or_try_init(|| async {
                match &self.source {
                    IdentitySource::Ephemeral => Ok(SecretKey::generate()?),
                    IdentitySource::Key(key) => Ok(key.clone()),
                    IdentitySource::KeyFile(path) => load_or_create(path).await,
                }
            })
            .await
    }

    /// The issuer as a `did:key`
    pub async fn did(&self) -> Result<Did, IdentityError> {
        Ok(Did::from_public_key(&self.identity().await?.public()))
    }
}

async fn load_or_create(path: &PathBuf) -> Result<SecretKey, IdentityError> {
    match tokio::fs::read_to_string(path).await {
        Ok(pem) => Ok(SecretKey::from_pem(&pem)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let key = SecretKey::generate()?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, key.to_pem()).await?;
            tracing::info!(path = %path.display(), "created issuer key");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_initialisation_converges() {
        let ctx = Arc::new(ShareContext::ephemeral());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                ctx.identity().await.unwrap().public()
            }));
        }

        let mut keys = Vec::new();
        for handle in handles {
            keys.push(handle.await.unwrap());
        }
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_key_file_created_then_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("key.pem");

        let first = ShareContext::new(IdentitySource::KeyFile(path.clone()));
        let created = first.identity().await.unwrap().public();
        assert!(path.exists());

        let second = ShareContext::new(IdentitySource::KeyFile(path));
        assert_eq!(second.identity().await.unwrap().public(), created);
    }

    #[tokio::test]
    async fn test_corrupt_key_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("key.pem");
        std::fs::write(&path, "not a pem").unwrap();

        let ctx = ShareContext::new(IdentitySource::KeyFile(path));
        assert!(ctx.identity().await.is_err());
    }

    #[tokio::test]
    async fn test_given_key_is_used() {
        let key = SecretKey::generate().unwrap();
        let ctx = ShareContext::with_key(key.clone());
        assert_eq!(ctx.did().await.unwrap(), Did::from_public_key(&key.public()));
    }
}
