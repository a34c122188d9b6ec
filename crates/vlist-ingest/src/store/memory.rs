//! In-memory document store
//!
//! Reference implementation of the storage port used by tests and local
//! tooling. Collections are ordered maps so listing is deterministic.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{Document, DocumentStore, WriteBatch, WriteOp, DEFAULT_MAX_BATCH_OPERATIONS};
use crate::error::{StoreError, StoreResult};

type Collection = BTreeMap<String, Document>;

#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    max_batch_operations: usize,
    commits: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_batch_operations(DEFAULT_MAX_BATCH_OPERATIONS)
    }

    pub fn with_max_batch_operations(max_batch_operations: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            max_batch_operations: max_batch_operations.max(1),
            commits: AtomicUsize::new(0),
        }
    }

    /// Number of batches committed so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of documents in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn apply(collections: &mut HashMap<String, Collection>, op: WriteOp) {
        match op {
            WriteOp::Put {
                collection,
                id,
                document,
            } => {
                collections.entry(collection).or_default().insert(id, document);
            },
            WriteOp::Merge {
                collection,
                id,
                document,
            } => {
                let stored = collections.entry(collection).or_default().entry(id).or_default();
                stored.extend(document);
            },
            WriteOp::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            },
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<Option<Document>>> {
        let collections = self.collections.read().await;
        let docs = collections.get(collection);
        Ok(ids
            .iter()
            .map(|id| docs.and_then(|docs| docs.get(id)).cloned())
            .collect())
    }

    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            WriteOp::Put {
                collection: collection.to_string(),
                id: id.to_string(),
                document,
            },
        );
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            WriteOp::Merge {
                collection: collection.to_string(),
                id: id.to_string(),
                document,
            },
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            WriteOp::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            },
        );
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(String, Document)>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| doc.get(field) == Some(value))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.len() > self.max_batch_operations {
            return Err(StoreError::BatchTooLarge {
                operations: batch.len(),
                limit: self.max_batch_operations,
            });
        }

        // one write guard spans the whole batch
        let mut collections = self.collections.write().await;
        for op in batch.into_ops() {
            Self::apply(&mut collections, op);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn max_batch_operations(&self) -> usize {
        self.max_batch_operations
    }
}
