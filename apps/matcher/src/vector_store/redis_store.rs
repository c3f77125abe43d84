//! Redis-backed cache of processed CVs.
//!
//! Layout: each document is a JSON string at `{prefix}:doc:{id}`; the set
//! `{prefix}:ids` indexes them. Queries load every document and rank in-process,
//! which is fine for per-job CV counts. The connection is opened on first use.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{nearest, StoreError, StoredCv, VectorStore};

pub struct RedisVectorStore {
    client: redis::Client,
    key_prefix: String,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisVectorStore {
    /// Validates the URL; no connection is made until the first operation.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            key_prefix: key_prefix.into(),
            conn: OnceCell::new(),
        })
    }

    /// Shared multiplexed connection. Concurrent first callers wait on one connect.
    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self.client.get_multiplexed_async_connection().await?;
                info!("Redis vector store connected (prefix '{}')", self.key_prefix);
                Ok::<_, StoreError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    fn doc_key(&self, id: &str) -> String {
        format!("{}:doc:{}", self.key_prefix, id)
    }

    fn ids_key(&self) -> String {
        format!("{}:ids", self.key_prefix)
    }
}

#[async_trait]
impl VectorStore for RedisVectorStore {
    async fn upsert(&self, doc: StoredCv) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&doc)?;

        redis::pipe()
            .atomic()
            .set(self.doc_key(&doc.id), payload)
            .ignore()
            .sadd(self.ids_key(), &doc.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn add(&self, doc: StoredCv) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&doc)?;

        let created: Option<String> = redis::cmd("SET")
            .arg(self.doc_key(&doc.id))
            .arg(payload)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        if created.is_none() {
            return Err(StoreError::AlreadyExists(doc.id));
        }

        conn.sadd::<_, _, ()>(self.ids_key(), &doc.id).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        let (removed, _): (u64, u64) = redis::pipe()
            .atomic()
            .del(self.doc_key(id))
            .srem(self.ids_key(), id)
            .query_async(&mut conn)
            .await?;
        if removed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        n: usize,
    ) -> Result<Vec<(StoredCv, f32)>, StoreError> {
        let mut conn = self.connection().await?;

        let ids: Vec<String> = conn.smembers(self.ids_key()).await?;
        if ids.is_empty() || n == 0 {
            return Ok(vec![]);
        }

        let keys: Vec<String> = ids.iter().map(|id| self.doc_key(id)).collect();
        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let docs = decode_payloads(&keys, payloads);
        Ok(nearest(docs, embedding, n))
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.scard(self.ids_key()).await?)
    }
}

/// Decodes MGET results. Missing keys and unreadable documents are skipped.
fn decode_payloads(keys: &[String], payloads: Vec<Option<String>>) -> Vec<StoredCv> {
    keys.iter()
        .zip(payloads)
        .filter_map(|(key, payload)| {
            let payload = payload?;
            match serde_json::from_str::<StoredCv>(&payload) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("Skipping unreadable cached CV at {key}: {e}");
                    None
                }
            }
        })
        .collect()
}
