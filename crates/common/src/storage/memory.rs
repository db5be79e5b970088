use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use cid::Cid;
use parking_lot::RwLock;

use super::{locator_for, Storage, TransportError};

/// Content-addressed store held in memory
///
/// Cheap to clone; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<Cid, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Replace the bytes at `locator` without re-addressing them.
    ///
    /// Simulates a gateway serving corrupted content.
    pub fn overwrite(&self, locator: &Cid, bytes: Bytes) {
        self.blobs.write().insert(*locator, bytes);
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<Cid, TransportError> {
        let locator = locator_for(&bytes);
        tracing::debug!(%locator, name, size = bytes.len(), "stored blob in memory");
        self.blobs.write().insert(locator, bytes);
        Ok(locator)
    }

    async fn download(&self, locator: &Cid) -> Result<Bytes, TransportError> {
        self.blobs
            .read()
            .get(locator)
            .cloned()
            .ok_or(TransportError::NotFound(*locator))
    }
}
