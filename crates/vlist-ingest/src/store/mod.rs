//! Storage port
//!
//! The ingest core talks to its document database only through
//! [`DocumentStore`]. Documents are JSON objects addressed by
//! `(collection, id)`; the batched write is atomic and bounded by
//! [`DocumentStore::max_batch_operations`].

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

pub mod memory;

pub use memory::MemoryStore;

/// A stored document body
pub type Document = Map<String, Value>;

/// Operation cap of typical document backends for one atomic batch
pub const DEFAULT_MAX_BATCH_OPERATIONS: usize = 500;

/// Reads kept in flight by the default [`DocumentStore::get_many`]
pub const DEFAULT_READ_CONCURRENCY: usize = 16;

fn document_error(collection: &str, id: &str, message: impl Into<String>) -> StoreError {
    StoreError::Document {
        collection: collection.to_string(),
        id: id.to_string(),
        message: message.into(),
    }
}

/// Serialize a value into a document body
pub fn to_document<T: Serialize>(collection: &str, id: &str, value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(document_error(collection, id, format!("expected an object, got {other}"))),
        Err(e) => Err(document_error(collection, id, e.to_string())),
    }
}

/// Deserialize a stored document body
pub fn from_document<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    document: Document,
) -> StoreResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| document_error(collection, id, e.to_string()))
}

/// One write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace the whole document
    Put {
        collection: String,
        id: String,
        document: Document,
    },
    /// Upsert: fields present here overwrite, every other stored field is kept
    Merge {
        collection: String,
        id: String,
        document: Document,
    },
    /// Remove the document; deleting a missing document is a no-op
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. }
            | WriteOp::Merge { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Merge { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// Ordered set of writes committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    pub fn put(&mut self, collection: impl Into<String>, id: impl Into<String>, document: Document) {
        self.ops.push(WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            document,
        });
    }

    pub fn merge(&mut self, collection: impl Into<String>, id: impl Into<String>, document: Document) {
        self.ops.push(WriteOp::Merge {
            collection: collection.into(),
            id: id.into(),
            document,
        });
    }

    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Document database capability injected into the builder, batcher and service
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document by key
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Read several documents by key; results follow the order of `ids`
    ///
    /// The default keeps up to [`DEFAULT_READ_CONCURRENCY`] single reads in
    /// flight. Backends with a multi-key read should override it.
    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<Option<Document>>> {
        let reads: Vec<_> = ids.iter().map(|id| self.get(collection, id)).collect();
        stream::iter(reads)
            .buffered(DEFAULT_READ_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Replace one document
    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()>;

    /// Upsert one document, keeping fields not present in `document`
    async fn merge(&self, collection: &str, id: &str, document: Document) -> StoreResult<()>;

    /// Delete one document; missing documents are not an error
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Documents whose `field` equals `value`, as `(id, document)` pairs
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(String, Document)>>;

    /// Every document of a collection, as `(id, document)` pairs
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>>;

    /// Apply every operation of `batch` atomically
    ///
    /// Implementations reject batches larger than
    /// [`max_batch_operations`](Self::max_batch_operations) without applying
    /// anything.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Largest number of operations one [`commit`](Self::commit) accepts
    fn max_batch_operations(&self) -> usize {
        DEFAULT_MAX_BATCH_OPERATIONS
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        (**self).get(collection, id).await
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<Option<Document>>> {
        (**self).get_many(collection, ids).await
    }

    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        (**self).put(collection, id, document).await
    }

    async fn merge(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        (**self).merge(collection, id, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        (**self).delete(collection, id).await
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(String, Document)>> {
        (**self).query_eq(collection, field, value).await
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        (**self).list(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).commit(batch).await
    }

    fn max_batch_operations(&self) -> usize {
        (**self).max_batch_operations()
    }
}
