//! List operations
//!
//! [`ListService`] is what the dashboard calls: create a list from an uploaded
//! grid, read lists and their vehicles back, edit column visibility and
//! status, and delete a list together with its vehicles.

use chrono::{DateTime, Utc};
use futures::stream::{self, LocalBoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use vlist_common::types::{column_headers, ColumnHeader, RawGrid};

use crate::batcher::{IngestBatcher, IngestProgress, IngestRun};
use crate::classify::{classify_grid, ClassifiedGrid};
use crate::columns::{ColumnDescriptor, ColumnLayout};
use crate::config::IngestSettings;
use crate::error::{IngestError, IngestResult, StoreError};
use crate::list::{list_id_for, ListMetadata, ListStatus};
use crate::record::{RecordBuilder, VehicleRecord, LIST_PARENT_FIELD};
use crate::store::{from_document, to_document, Document, DocumentStore, WriteBatch};
use crate::upload::check_upload;

/// Everything needed to turn one uploaded sheet into a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub file_name: String,
    pub identifier_column: usize,
    /// Display name of the identifier column; the header name when empty
    #[serde(default)]
    pub identifier_column_name: String,
    /// Columns agents may see
    #[serde(default)]
    pub agent_columns: Vec<usize>,
    /// Column headers as picked in the UI; derived from the grid when empty
    #[serde(default)]
    pub column_headers: Vec<ColumnHeader>,
    pub grid: RawGrid,
}

impl CreateListRequest {
    pub fn new(file_name: impl Into<String>, grid: RawGrid, identifier_column: usize) -> Self {
        Self {
            file_name: file_name.into(),
            identifier_column,
            identifier_column_name: String::new(),
            agent_columns: Vec::new(),
            column_headers: Vec::new(),
            grid,
        }
    }

    /// Request for a grid in the array-of-arrays JSON form sheet readers emit
    pub fn from_json_grid(
        file_name: impl Into<String>,
        grid_json: &str,
        identifier_column: usize,
    ) -> IngestResult<Self> {
        let grid = RawGrid::from_json_str(grid_json)?;
        Ok(Self::new(file_name, grid, identifier_column))
    }

    pub fn with_agent_columns(mut self, agent_columns: impl Into<Vec<usize>>) -> Self {
        self.agent_columns = agent_columns.into();
        self
    }

    pub fn with_identifier_column_name(mut self, name: impl Into<String>) -> Self {
        self.identifier_column_name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListResult {
    pub list_id: String,
    /// Records whose key was not stored before
    pub new_count: usize,
    /// Records that merged into an existing key
    pub updated_count: usize,
    pub total_count: usize,
    /// Rows rejected by validation and left out
    pub invalid_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteListResult {
    pub deleted_record_count: usize,
}

/// A list whose metadata is written and whose records are being committed
///
/// Batches are only written while the session is polled, through
/// [`next`](Self::next), [`progress`](Self::progress) or
/// [`finish`](Self::finish).
pub struct IngestSession<'a, S: DocumentStore + ?Sized> {
    metadata: ListMetadata,
    classification: ClassifiedGrid,
    run: IngestRun<'a, S>,
    new_count: usize,
    updated_count: usize,
}

impl<'a, S: DocumentStore + ?Sized> IngestSession<'a, S> {
    pub fn list_id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &ListMetadata {
        &self.metadata
    }

    /// Validation outcome of the uploaded grid, including every rejected row
    pub fn classification(&self) -> &ClassifiedGrid {
        &self.classification
    }

    pub fn total_batches(&self) -> usize {
        self.run.total_batches()
    }

    /// Commit the next batch
    pub async fn next(&mut self) -> Option<IngestResult<IngestProgress>> {
        self.run.next().await
    }

    /// Remaining batches as a stream of progress events
    ///
    /// Dropping the stream stops further writes; the session can still be
    /// finished afterwards.
    pub fn progress(&mut self) -> LocalBoxStream<'_, IngestResult<IngestProgress>> {
        stream::unfold(&mut self.run, |run| async move {
            let step = run.next().await?;
            Some((step, run))
        })
        .boxed_local()
    }

    /// Commit whatever is left and summarize the ingest
    pub async fn finish(mut self) -> IngestResult<CreateListResult> {
        self.finish_with(|_| {}).await
    }

    async fn finish_with<F>(&mut self, on_progress: F) -> IngestResult<CreateListResult>
    where
        F: FnMut(&IngestProgress),
    {
        if let Some(err) = self.run.halt_error() {
            return Err(err);
        }
        self.run.drain(on_progress).await?;

        info!(
            list_id = %self.metadata.id,
            new = self.new_count,
            updated = self.updated_count,
            "Successfully created list"
        );

        Ok(CreateListResult {
            list_id: self.metadata.id.clone(),
            new_count: self.new_count,
            updated_count: self.updated_count,
            total_count: self.metadata.total_records,
            invalid_count: self.classification.invalid_count,
        })
    }
}

/// Dashboard operations over an injected document store
pub struct ListService<S: DocumentStore> {
    store: S,
    settings: IngestSettings,
}

impl<S: DocumentStore> ListService<S> {
    pub fn new(store: S, settings: IngestSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Validate, classify and prepare a list created now
    pub async fn start_ingest(
        &self,
        request: CreateListRequest,
        cancel: CancellationToken,
    ) -> IngestResult<IngestSession<'_, S>> {
        self.start_ingest_at(request, Utc::now(), cancel).await
    }

    /// Validate, classify and prepare a list created at `now`
    ///
    /// Input problems are reported before anything is written. On success the
    /// list metadata is stored and the returned session commits the vehicle
    /// records batch by batch.
    #[instrument(skip(self, request, cancel), fields(file_name = %request.file_name))]
    pub async fn start_ingest_at(
        &self,
        request: CreateListRequest,
        now: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> IngestResult<IngestSession<'_, S>> {
        check_upload(
            &self.settings,
            &request.file_name,
            &request.grid,
            request.identifier_column,
            &request.agent_columns,
        )?;

        let classification = classify_grid(&request.grid, request.identifier_column);
        let list_id = list_id_for(&request.file_name, now);

        let headers = if request.column_headers.is_empty() {
            column_headers(&request.grid)
        } else {
            request.column_headers
        };
        let layout = ColumnLayout::new(&headers, &request.agent_columns);

        let identifier_column_name = if request.identifier_column_name.trim().is_empty() {
            headers
                .iter()
                .find(|h| h.index == request.identifier_column)
                .map(|h| h.name.clone())
                .unwrap_or_default()
        } else {
            request.identifier_column_name
        };

        let built = RecordBuilder::new(&layout, request.identifier_column, &list_id, now)
            .build_resolved(
                classification.accepted_rows(),
                &self.store,
                &self.settings.vehicles_collection,
            )
            .await?;

        let metadata = ListMetadata {
            id: list_id.clone(),
            file_name: request.file_name,
            identifier_column: request.identifier_column,
            identifier_column_name,
            columns: layout,
            total_records: built.records.len(),
            upload_date: now,
            created_by: self.settings.created_by.clone(),
            status: ListStatus::Active,
        };

        let document = to_document(&self.settings.lists_collection, &list_id, &metadata)?;
        self.store
            .put(&self.settings.lists_collection, &list_id, document)
            .await?;

        info!(
            list_id = %list_id,
            columns = metadata.columns.len(),
            agent_columns = metadata.columns.visible().count(),
            records = metadata.total_records,
            invalid = classification.invalid_count,
            "Stored list metadata"
        );

        let batcher = IngestBatcher::new(
            &self.store,
            self.settings.vehicles_collection.as_str(),
            self.settings.batch_size,
        );
        let run = batcher.run(built.records, cancel);

        Ok(IngestSession {
            metadata,
            classification,
            run,
            new_count: built.new_count,
            updated_count: built.updated_count,
        })
    }

    /// Create a list and commit every record, reporting each batch
    pub async fn build_and_ingest<F>(
        &self,
        request: CreateListRequest,
        on_progress: F,
    ) -> IngestResult<CreateListResult>
    where
        F: FnMut(&IngestProgress),
    {
        let mut session = self.start_ingest(request, CancellationToken::new()).await?;
        session.finish_with(on_progress).await
    }

    pub async fn fetch_list(&self, list_id: &str) -> IngestResult<Option<ListMetadata>> {
        let collection = &self.settings.lists_collection;
        match self.store.get(collection, list_id).await? {
            Some(document) => Ok(Some(from_document(collection, list_id, document)?)),
            None => Ok(None),
        }
    }

    async fn require_list(&self, list_id: &str) -> IngestResult<ListMetadata> {
        self.fetch_list(list_id)
            .await?
            .ok_or_else(|| IngestError::ListNotFound(list_id.to_string()))
    }

    /// Every list, newest upload first
    pub async fn fetch_lists(&self) -> IngestResult<Vec<ListMetadata>> {
        let collection = &self.settings.lists_collection;
        let mut lists = self
            .store
            .list(collection)
            .await?
            .into_iter()
            .map(|(id, document)| from_document::<ListMetadata>(collection, &id, document))
            .collect::<Result<Vec<_>, StoreError>>()?;

        lists.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(lists)
    }

    /// Vehicles of one list in upload order
    pub async fn fetch_vehicles(&self, list_id: &str) -> IngestResult<Vec<VehicleRecord>> {
        let collection = &self.settings.vehicles_collection;
        let mut vehicles = self
            .store
            .query_eq(collection, LIST_PARENT_FIELD, &Value::from(list_id))
            .await?
            .into_iter()
            .map(|(id, document)| VehicleRecord::from_document(collection, &id, document))
            .collect::<Result<Vec<_>, StoreError>>()?;

        vehicles.sort_by_key(|v| v.row_index);
        Ok(vehicles)
    }

    /// Replace the column descriptors of a list
    ///
    /// Only visibility may change: the columns must keep their indices and
    /// field names, since records are already stored under them.
    #[instrument(skip(self, columns))]
    pub async fn update_column_visibility(
        &self,
        list_id: &str,
        columns: Vec<ColumnDescriptor>,
    ) -> IngestResult<()> {
        let list = self.require_list(list_id).await?;
        if !list.columns.same_shape(&columns) {
            return Err(IngestError::InvalidColumns(format!(
                "columns of list {list_id} must keep their indices and field names"
            )));
        }

        let layout = ColumnLayout::from_descriptors(columns);
        self.write_columns(list_id, &layout).await?;

        info!(
            list_id = %list_id,
            visible = layout.visible().count(),
            total = layout.len(),
            "Updated column visibility"
        );
        Ok(())
    }

    /// Show or hide one column of a list
    pub async fn set_column_visibility(
        &self,
        list_id: &str,
        column_index: usize,
        visible: bool,
    ) -> IngestResult<ListMetadata> {
        let mut list = self.require_list(list_id).await?;
        if !list.columns.set_visibility(column_index, visible) {
            return Err(IngestError::InvalidColumns(format!(
                "list {list_id} has no column {column_index}"
            )));
        }

        self.write_columns(list_id, &list.columns).await?;
        info!(list_id = %list_id, column = column_index, visible, "Toggled column visibility");
        Ok(list)
    }

    async fn write_columns(&self, list_id: &str, layout: &ColumnLayout) -> IngestResult<()> {
        #[derive(Serialize)]
        struct ColumnsPatch<'c> {
            columns: &'c ColumnLayout,
        }

        let collection = &self.settings.lists_collection;
        let document = to_document(collection, list_id, &ColumnsPatch { columns: layout })?;
        self.store.merge(collection, list_id, document).await?;
        Ok(())
    }

    /// Mark a list active or inactive
    pub async fn set_list_status(&self, list_id: &str, status: ListStatus) -> IngestResult<()> {
        self.require_list(list_id).await?;

        let collection = &self.settings.lists_collection;
        let mut document = Document::new();
        document.insert("status".to_string(), Value::from(status.as_str()));
        self.store.merge(collection, list_id, document).await?;

        info!(list_id = %list_id, status = %status, "Updated list status");
        Ok(())
    }

    /// Delete a list and every vehicle that belongs to it
    ///
    /// Deletes are chunked by the store's batch limit with the list document
    /// in the last chunk. Deleting a list that no longer exists succeeds with
    /// zero records, so a failed delete can simply be retried.
    #[instrument(skip(self))]
    pub async fn delete_list(&self, list_id: &str) -> IngestResult<DeleteListResult> {
        let delete_failed = |source| IngestError::DeleteFailed {
            list_id: list_id.to_string(),
            source,
        };

        let vehicles_collection = &self.settings.vehicles_collection;
        let vehicles = self
            .store
            .query_eq(vehicles_collection, LIST_PARENT_FIELD, &Value::from(list_id))
            .await
            .map_err(delete_failed)?;
        let deleted_record_count = vehicles.len();

        let mut ops = WriteBatch::with_capacity(deleted_record_count + 1);
        for (id, _) in vehicles {
            ops.delete(vehicles_collection.as_str(), id);
        }
        ops.delete(self.settings.lists_collection.as_str(), list_id);

        let chunk_size = self.store.max_batch_operations().max(1);
        let all_ops = ops.into_ops();
        let total_chunks = all_ops.len().div_ceil(chunk_size);

        for (chunk_index, chunk) in all_ops.chunks(chunk_size).enumerate() {
            let mut batch = WriteBatch::with_capacity(chunk.len());
            for op in chunk {
                batch.delete(op.collection(), op.id());
            }

            if let Err(source) = self.store.commit(batch).await {
                warn!(
                    list_id = %list_id,
                    chunk = chunk_index + 1,
                    total = total_chunks,
                    error = %source,
                    "List delete failed"
                );
                return Err(delete_failed(source));
            }
        }

        info!(list_id = %list_id, records = deleted_record_count, "Deleted list");
        Ok(DeleteListResult {
            deleted_record_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use vlist_common::types::CellValue;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        RawGrid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| CellValue::from(*c)).collect())
                .collect(),
        )
    }

    fn sheet() -> RawGrid {
        grid(&[
            &["Vehicle No", "Owner", "Model"],
            &["dl 01 ab 1234", "Asha", "Swift"],
            &["XX01AB1234", "Ben", "Alto"],
            &["KA05 1234", "Chen", ""],
        ])
    }

    fn service() -> ListService<MemoryStore> {
        ListService::new(MemoryStore::new(), IngestSettings::default())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_start_ingest_writes_metadata_first() {
        let service = service();
        let request = CreateListRequest::new("June Fleet.xlsx", sheet(), 0).with_agent_columns([0, 2]);

        let session = service
            .start_ingest_at(request, now(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(session.list_id(), "June_Fleet_xlsx_20240601");
        assert_eq!(session.classification().invalid_count, 1);
        assert_eq!(session.total_batches(), 1);

        // metadata is visible before any vehicle batch is committed
        let stored = service.fetch_list("June_Fleet_xlsx_20240601").await.unwrap().unwrap();
        assert_eq!(stored.identifier_column_name, "Vehicle No");
        assert_eq!(stored.total_records, 2);
        assert_eq!(stored.created_by, "admin");
        assert_eq!(service.store().count("vehicleno").await, 0);

        let result = session.finish().await.unwrap();
        assert_eq!(
            result,
            CreateListResult {
                list_id: "June_Fleet_xlsx_20240601".to_string(),
                new_count: 2,
                updated_count: 0,
                total_count: 2,
                invalid_count: 1,
            }
        );
        assert_eq!(service.store().count("vehicleno").await, 2);
    }

    #[test]
    fn test_request_from_json_grid() {
        let request =
            CreateListRequest::from_json_grid("fleet.xlsx", r#"[["Vehicle No"], ["DL01AB1234"]]"#, 0)
                .unwrap();
        assert_eq!(request.grid.data_row_count(), 1);

        assert!(matches!(
            CreateListRequest::from_json_grid("fleet.xlsx", r#"{"rows": []}"#, 0),
            Err(IngestError::Grid(_))
        ));
    }

    #[tokio::test]
    async fn test_input_errors_write_nothing() {
        let service = service();
        let err = service
            .start_ingest(CreateListRequest::new("fleet.pdf", sheet(), 0), CancellationToken::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, IngestError::Input(_)));
        assert_eq!(service.store().count("lists").await, 0);
    }

    #[tokio::test]
    async fn test_fetch_vehicles_in_row_order() {
        let service = service();
        service
            .build_and_ingest(CreateListRequest::new("fleet.xlsx", sheet(), 0), |_| {})
            .await
            .unwrap();

        assert!(service.fetch_vehicles("no_such_list").await.unwrap().is_empty());

        let list_id = service.fetch_lists().await.unwrap()[0].id.clone();
        let vehicles = service.fetch_vehicles(&list_id).await.unwrap();
        let numbers: Vec<&str> = vehicles.iter().map(|v| v.vehicle_number.as_str()).collect();
        assert_eq!(numbers, vec!["DL01AB1234", "KA051234"]);
        assert_eq!(vehicles[1].field("model"), Some(&CellValue::from("")));
    }

    #[tokio::test]
    async fn test_status_and_single_column_toggle() {
        let service = service();
        let result = service
            .build_and_ingest(
                CreateListRequest::new("fleet.xlsx", sheet(), 0).with_agent_columns([0]),
                |_| {},
            )
            .await
            .unwrap();

        service
            .set_list_status(&result.list_id, ListStatus::Inactive)
            .await
            .unwrap();
        let list = service
            .set_column_visibility(&result.list_id, 1, true)
            .await
            .unwrap();
        assert!(list.columns.get(1).unwrap().visible_to_agent);

        let stored = service.fetch_list(&result.list_id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListStatus::Inactive);
        assert_eq!(stored.columns, list.columns);

        assert!(matches!(
            service.set_column_visibility(&result.list_id, 9, true).await,
            Err(IngestError::InvalidColumns(_))
        ));
        assert!(matches!(
            service.set_list_status("missing", ListStatus::Active).await,
            Err(IngestError::ListNotFound(_))
        ));
    }
}
