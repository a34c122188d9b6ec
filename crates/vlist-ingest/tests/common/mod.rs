//! Common test utilities for VList ingest integration tests
//!
//! - tracing setup that writes through the test harness
//! - sheet builders
//! - [`FailingStore`], a document store that fails on demand

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use vlist_common::types::{CellValue, RawGrid};
use vlist_ingest::store::{Document, DocumentStore, MemoryStore, WriteBatch};
use vlist_ingest::{IngestSettings, StoreError, StoreResult};

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vlist_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Grid from string cells; the first row is the header
pub fn grid(rows: &[&[&str]]) -> RawGrid {
    RawGrid::new(
        rows.iter()
            .map(|row| row.iter().map(|cell| CellValue::from(*cell)).collect())
            .collect(),
    )
}

/// Single-column sheet of `count` distinct valid registration numbers
pub fn plate_sheet(count: usize) -> RawGrid {
    let mut rows = vec![vec![CellValue::from("Vehicle No")]];
    rows.extend((0..count).map(|i| vec![CellValue::from(format!("DL01AB{i:04}"))]));
    RawGrid::new(rows)
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn settings_with_batch_size(batch_size: usize) -> IngestSettings {
    IngestSettings {
        batch_size,
        ..IngestSettings::default()
    }
}

/// In-memory store whose batch commits and queries can be made to fail
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    /// 1-based commit attempt that fails; 0 disables
    fail_on_commit: AtomicUsize,
    fail_queries: AtomicBool,
    commit_attempts: AtomicUsize,
    multi_reads: AtomicUsize,
    keys_read: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_commit(attempt: usize) -> Self {
        let store = Self::new();
        store.fail_on_commit.store(attempt, Ordering::SeqCst);
        store
    }

    pub fn fail_commit(&self, attempt: usize) {
        self.commit_attempts.store(0, Ordering::SeqCst);
        self.fail_on_commit.store(attempt, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Number of multi-key reads and the keys they asked for
    pub fn reads(&self) -> (usize, usize) {
        (
            self.multi_reads.load(Ordering::SeqCst),
            self.keys_read.load(Ordering::SeqCst),
        )
    }

    pub fn heal(&self) {
        self.fail_on_commit.store(0, Ordering::SeqCst);
        self.fail_queries.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<Option<Document>>> {
        self.multi_reads.fetch_add(1, Ordering::SeqCst);
        self.keys_read.fetch_add(ids.len(), Ordering::SeqCst);
        self.inner.get_many(collection, ids).await
    }

    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        self.inner.put(collection, id, document).await
    }

    async fn merge(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        self.inner.merge(collection, id, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<(String, Document)>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("query unavailable".to_string()));
        }
        self.inner.query_eq(collection, field, value).await
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        self.inner.list(collection).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let attempt = self.commit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("commit {attempt} rejected")));
        }
        self.inner.commit(batch).await
    }

    fn max_batch_operations(&self) -> usize {
        self.inner.max_batch_operations()
    }
}
