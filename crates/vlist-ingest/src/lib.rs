//! VList Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Cleans vehicle registration numbers out of uploaded spreadsheets and
//! ingests the accepted rows as vehicle records grouped into lists.
//!
//! # Pipeline
//!
//! - **Plate**: normalize and validate registration numbers ([`plate`])
//! - **Classify**: split a grid into accepted rows and diagnostics ([`classify_grid`])
//! - **Records**: build keyed vehicle records from accepted rows ([`record`])
//! - **Batcher**: commit records in bounded atomic batches with progress ([`batcher`])
//! - **Service**: list create/read/update/delete over a [`DocumentStore`] ([`ListService`])
//!
//! # Example
//!
//! ```no_run
//! use vlist_common::types::RawGrid;
//! use vlist_ingest::{CreateListRequest, IngestSettings, ListService, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let grid = RawGrid::from_json_str(r#"[["Vehicle No", "Owner"], ["dl 01 ab 1234", "Asha"]]"#)?;
//!     let service = ListService::new(MemoryStore::new(), IngestSettings::load()?);
//!
//!     let request = CreateListRequest::new("fleet.xlsx", grid, 0).with_agent_columns([0, 1]);
//!     let result = service
//!         .build_and_ingest(request, |p| println!("{:.1}%", p.percent_complete))
//!         .await?;
//!     println!("{} vehicles in {}", result.total_count, result.list_id);
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod classify;
pub mod columns;
pub mod config;
pub mod error;
pub mod list;
pub mod plate;
pub mod record;
pub mod service;
pub mod store;
pub mod upload;

pub use batcher::{IngestBatcher, IngestProgress, IngestRun};
pub use classify::{classify_grid, ClassifiedGrid};
pub use columns::{sanitize_field_name, ColumnDescriptor, ColumnLayout};
pub use config::IngestSettings;
pub use error::{IngestError, IngestResult, InputError, StoreError, StoreResult};
pub use list::{list_id_for, ListMetadata, ListStatus};
pub use plate::{normalize, validate_identifier, validate_plate, validate_plates, ValidationOutcome};
pub use record::{AgentField, RecordBuilder, VehicleRecord};
pub use service::{CreateListRequest, CreateListResult, DeleteListResult, IngestSession, ListService};
pub use store::{Document, DocumentStore, MemoryStore, WriteBatch, WriteOp};
pub use upload::{check_upload, preview_agent_view, AgentPreview};
