//! Batched record ingest
//!
//! Records are written in contiguous groups, one atomic store batch per
//! group, strictly one after another. Each committed group yields one
//! [`IngestProgress`]. The first failure ends the run and reports how many
//! groups were already committed; cancellation is honoured between groups
//! only, so a group is never half written.

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{IngestError, IngestResult, StoreError, StoreResult};
use crate::record::VehicleRecord;
use crate::store::{DocumentStore, WriteBatch};

/// Progress after one committed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestProgress {
    pub batches_completed: usize,
    pub total_batches: usize,
    /// Share of records committed so far, 0 to 100
    pub percent_complete: f64,
    pub records_processed: usize,
    pub total_records: usize,
}

impl IngestProgress {
    pub fn is_complete(&self) -> bool {
        self.batches_completed == self.total_batches
    }
}

/// Writes vehicle records into one collection in bounded batches
pub struct IngestBatcher<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    collection: String,
    batch_size: usize,
}

impl<'a, S: DocumentStore + ?Sized> IngestBatcher<'a, S> {
    /// `batch_size` is capped at the store's own per-batch limit
    pub fn new(store: &'a S, collection: impl Into<String>, batch_size: usize) -> Self {
        let batch_size = batch_size.min(store.max_batch_operations()).max(1);
        Self {
            store,
            collection: collection.into(),
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches `record_count` records need
    pub fn batch_count(&self, record_count: usize) -> usize {
        record_count.div_ceil(self.batch_size)
    }

    /// Prepare a run over `records`; nothing is written until it is polled
    pub fn run(&self, records: Vec<VehicleRecord>, cancel: CancellationToken) -> IngestRun<'a, S> {
        let total_batches = self.batch_count(records.len());
        info!(
            collection = %self.collection,
            records = records.len(),
            batches = total_batches,
            batch_size = self.batch_size,
            "Starting vehicle ingest"
        );

        IngestRun {
            store: self.store,
            collection: self.collection.clone(),
            batch_size: self.batch_size,
            records,
            total_batches,
            batches_completed: 0,
            cancel,
            halt: None,
        }
    }
}

/// Why a run stopped before its last batch
#[derive(Debug, Clone, PartialEq, Eq)]
enum RunHalt {
    Cancelled,
    Failed { failed_batch: usize, source: StoreError },
}

/// A lazy, finite, non-restartable sequence of batch commits
pub struct IngestRun<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    collection: String,
    batch_size: usize,
    records: Vec<VehicleRecord>,
    total_batches: usize,
    batches_completed: usize,
    cancel: CancellationToken,
    halt: Option<RunHalt>,
}

impl<'a, S: DocumentStore + ?Sized> IngestRun<'a, S> {
    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    pub fn batches_completed(&self) -> usize {
        self.batches_completed
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Every batch committed
    pub fn is_complete(&self) -> bool {
        self.batches_completed == self.total_batches
    }

    /// Nothing left to poll, either complete or halted
    pub fn is_finished(&self) -> bool {
        self.halt.is_some() || self.is_complete()
    }

    /// The error that halted this run, if any
    pub fn halt_error(&self) -> Option<IngestError> {
        self.halt.as_ref().map(|halt| self.error_for(halt.clone()))
    }

    fn error_for(&self, halt: RunHalt) -> IngestError {
        match halt {
            RunHalt::Cancelled => IngestError::Cancelled {
                committed_batches: self.batches_completed,
                total_batches: self.total_batches,
            },
            RunHalt::Failed {
                failed_batch,
                source,
            } => IngestError::BatchFailed {
                committed_batches: self.batches_completed,
                failed_batch,
                total_batches: self.total_batches,
                source,
            },
        }
    }

    fn stop(&mut self, halt: RunHalt) -> IngestError {
        let err = self.error_for(halt.clone());
        self.halt = Some(halt);
        err
    }

    /// Commit the next batch
    ///
    /// Returns `None` once every batch is committed or after an error has
    /// been returned.
    pub async fn next(&mut self) -> Option<IngestResult<IngestProgress>> {
        if self.is_finished() {
            return None;
        }

        if self.cancel.is_cancelled() {
            warn!(
                committed = self.batches_completed,
                total = self.total_batches,
                "Vehicle ingest cancelled"
            );
            return Some(Err(self.stop(RunHalt::Cancelled)));
        }

        let start = self.batches_completed * self.batch_size;
        let end = (start + self.batch_size).min(self.records.len());
        let batch_number = self.batches_completed + 1;

        if let Err(source) = self.commit_range(start, end).await {
            error!(
                batch = batch_number,
                total = self.total_batches,
                committed = self.batches_completed,
                error = %source,
                "Vehicle batch commit failed"
            );
            return Some(Err(self.stop(RunHalt::Failed {
                failed_batch: batch_number,
                source,
            })));
        }

        self.batches_completed = batch_number;
        let total_records = self.records.len();
        let progress = IngestProgress {
            batches_completed: batch_number,
            total_batches: self.total_batches,
            percent_complete: end as f64 / total_records as f64 * 100.0,
            records_processed: end,
            total_records,
        };

        info!(
            batch = batch_number,
            total = self.total_batches,
            records = end,
            percent = progress.percent_complete,
            "Vehicle batch committed"
        );

        Some(Ok(progress))
    }

    async fn commit_range(&self, start: usize, end: usize) -> StoreResult<()> {
        let mut batch = WriteBatch::with_capacity(end - start);
        for record in &self.records[start..end] {
            batch.merge(
                self.collection.as_str(),
                record.id.as_str(),
                record.to_document(&self.collection)?,
            );
        }
        self.store.commit(batch).await
    }

    /// Drive the run to completion, reporting each batch to `on_progress`
    ///
    /// Returns the final progress, or `None` when there was nothing to write.
    pub async fn drain<F>(&mut self, mut on_progress: F) -> IngestResult<Option<IngestProgress>>
    where
        F: FnMut(&IngestProgress),
    {
        let mut last = None;
        while let Some(step) = self.next().await {
            let progress = step?;
            on_progress(&progress);
            last = Some(progress);
        }
        Ok(last)
    }

    /// The run as a stream of progress events
    pub fn into_stream(self) -> impl Stream<Item = IngestResult<IngestProgress>> + 'a {
        stream::unfold(self, |mut run| async move {
            let step = run.next().await?;
            Some((step, run))
        })
    }
}
