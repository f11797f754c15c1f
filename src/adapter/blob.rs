//! In-memory blob storage adapter
//!
//! Produces `blob://` references for uploaded artifact bytes. Production
//! deployments put an object store behind the same port; the workflow core
//! only ever carries the reference string.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{domain::error::MarketError, port::blob::BlobStore};

/// In-memory `BlobStore` implementation
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self { blobs: Arc::new(RwLock::new(HashMap::new())) }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, MarketError> {
        let reference = format!("blob://{}/{}", Uuid::new_v4(), name);
        let mut blobs = self.blobs.write().await;
        blobs.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn fetch(&self, reference: &str) -> Result<Option<Vec<u8>>, MarketError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(reference).cloned())
    }
}
