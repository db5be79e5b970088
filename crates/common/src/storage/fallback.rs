use std::sync::Arc;

use bytes::Bytes;
use cid::Cid;

use super::{Storage, TransportError};

/// An ordered list of stores tried one after another
///
/// The first store to succeed wins and the rest are never contacted. When
/// every store has failed the result is [`TransportError::Exhausted`], which
/// callers treat as terminal. There is no backoff between attempts.
#[derive(Clone, Default)]
pub struct FallbackStorage {
    stores: Vec<Arc<dyn Storage>>,
}

impl std::fmt::Debug for FallbackStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStorage")
            .field("stores", &self.stores.len())
            .finish()
    }
}

impl FallbackStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, store: impl Storage + 'static) -> Self {
        self.stores.push(Arc::new(store));
        self
    }

    pub fn push(&mut self, store: Arc<dyn Storage>) {
        self.stores.push(store);
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[async_trait::async_trait]
impl Storage for FallbackStorage {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError> {
        for (attempt, store) in self.stores.iter().enumerate() {
            match store.upload(bytes.clone(), name).await {
                Ok(locator) => return Ok(locator),
                Err(e) => tracing::warn!(attempt, "upload failed, trying next store: {}", e),
            }
        }
        Err(TransportError::Exhausted)
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        for (attempt, store) in self.stores.iter().enumerate() {
            match store.download(locator).await {
                Ok(bytes) => {
                    tracing::debug!(%locator, attempt, "fetched ciphertext");
                    return Ok(bytes);
                }
                Err(e) => tracing::warn!(%locator, attempt, "fetch failed, trying next store: {}", e),
            }
        }
        Err(TransportError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::{locator_for, MemoryStorage};

    /// Always fails, counting how often it was asked
    #[derive(Default, Clone)]
    struct Broken {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Storage for Broken {
        async fn upload(&self, _bytes: Bytes, _name: &str) -> Result<Cid, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Request("gateway down".to_string()))
        }

        async fn download(&self, _locator: &Cid) -> Result<Bytes, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Request("gateway down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_working_store() {
        let broken = Broken::default();
        let memory = MemoryStorage::new();
        let locator = memory.upload(Bytes::from_static(b"data"), "d").await.unwrap();

        let storage = FallbackStorage::new().with(broken.clone()).with(memory);
        assert_eq!(storage.download(&locator).await.unwrap(), &b"data"[..]);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = MemoryStorage::new();
        let second = Broken::default();
        let locator = first.upload(Bytes::from_static(b"data"), "d").await.unwrap();

        let storage = FallbackStorage::new().with(first).with(second.clone());
        assert!(storage.download(&locator).await.is_ok());
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_is_terminal() {
        let storage = FallbackStorage::new()
            .with(Broken::default())
            .with(MemoryStorage::new());
        let result = storage.download(&locator_for(b"missing")).await;
        assert!(matches!(result, Err(TransportError::Exhausted)));

        let empty = FallbackStorage::new();
        assert!(matches!(
            empty.upload(Bytes::from_static(b"x"), "x").await,
            Err(TransportError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn test_upload_falls_back() {
        let memory = MemoryStorage::new();
        let storage = FallbackStorage::new()
            .with(Broken::default())
            .with(memory.clone());
        let locator = storage.upload(Bytes::from_static(b"abc"), "abc").await.unwrap();
        assert_eq!(memory.download(&locator).await.unwrap(), &b"abc"[..]);
    }
}
