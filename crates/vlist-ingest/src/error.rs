//! Ingest error types

use thiserror::Error;
use vlist_common::VlistError;

/// Result type alias for ingest operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Result type alias for storage port calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures raised by a [`DocumentStore`](crate::store::DocumentStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Batch of {operations} operations exceeds the limit of {limit}")]
    BatchTooLarge { operations: usize, limit: usize },

    #[error("Document error in {collection}/{id}: {message}")]
    Document {
        collection: String,
        id: String,
        message: String,
    },
}

/// Upload problems caught before any write is issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Unsupported file type: {file_name} (allowed: {allowed})")]
    UnsupportedFileType { file_name: String, allowed: String },

    #[error("File name is empty")]
    EmptyFileName,

    #[error("No data found in the uploaded sheet")]
    EmptySheet,

    #[error("Vehicle number column {index} is out of range ({width} columns)")]
    IdentifierColumnOutOfRange { index: usize, width: usize },

    #[error("Agent column {index} is out of range ({width} columns)")]
    AgentColumnOutOfRange { index: usize, width: usize },
}

/// Top-level error for list operations
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Grid error: {0}")]
    Grid(#[from] VlistError),

    #[error("Batch {failed_batch} of {total_batches} failed after {committed_batches} committed: {source}")]
    BatchFailed {
        committed_batches: usize,
        failed_batch: usize,
        total_batches: usize,
        #[source]
        source: StoreError,
    },

    #[error("Ingest cancelled after {committed_batches} of {total_batches} batches")]
    Cancelled {
        committed_batches: usize,
        total_batches: usize,
    },

    #[error("List not found: {0}")]
    ListNotFound(String),

    #[error("Failed to delete list {list_id}: {source}")]
    DeleteFailed {
        list_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid columns: {0}")]
    InvalidColumns(String),
}

impl IngestError {
    /// Batches that were durably written before this error, if it came from a run
    pub fn committed_batches(&self) -> Option<usize> {
        match self {
            IngestError::BatchFailed {
                committed_batches, ..
            }
            | IngestError::Cancelled {
                committed_batches, ..
            } => Some(*committed_batches),
            _ => None,
        }
    }
}
