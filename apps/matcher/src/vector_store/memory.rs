use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{nearest, StoreError, StoredCv, VectorStore};

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryVectorStore {
    docs: RwLock<HashMap<String, StoredCv>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, doc: StoredCv) -> Result<(), StoreError> {
        self.docs.write().await.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn add(&self, doc: StoredCv) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.id) {
            return Err(StoreError::AlreadyExists(doc.id));
        }
        docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.docs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn query(
        &self,
        embedding: &[f32],
        n: usize,
    ) -> Result<Vec<(StoredCv, f32)>, StoreError> {
        let docs = self.docs.read().await;
        Ok(nearest(docs.values().cloned(), embedding, n))
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.docs.read().await.len())
    }
}
