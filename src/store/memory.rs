use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::error::StoreError;

/// Process-local writable store for `memory://` locations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_writable(&self, _location: &str) -> bool {
        true
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        self.documents
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                location: location.to_string(),
                status: None,
            })
    }

    async fn write(&self, location: &str, body: Bytes) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(location.to_string(), body);
        Ok(())
    }
}
