//! Vehicle records
//!
//! A record is one accepted sheet row keyed by its cleaned registration
//! number. Fixed fields describe identity and provenance; every sheet column
//! is copied alongside under its cached field name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use vlist_common::types::CellValue;

use crate::columns::ColumnLayout;
use crate::error::StoreResult;
use crate::list::ListMetadata;
use crate::store::{from_document, to_document, Document, DocumentStore};

/// Stored names of the fixed part of a record
///
/// Fixed fields are camelCase while sanitized column keys are lowercase, so
/// only `id` can clash with a column.
pub const RESERVED_FIELDS: [&str; 8] = [
    "id",
    "vehicleNumber",
    "lastFourDigits",
    "listParentId",
    "rowIndex",
    "createdAt",
    "updatedAt",
    "showToAgent",
];

/// Field the cascade delete and list queries filter on
pub const LIST_PARENT_FIELD: &str = "listParentId";

const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    /// Storage key, equal to `vehicle_number`
    pub id: String,
    pub vehicle_number: String,
    pub last_four_digits: String,
    pub list_parent_id: String,
    /// Position among the accepted rows of the upload
    pub row_index: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub show_to_agent: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, CellValue>,
}

/// One label/value pair of the agent-facing view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentField {
    pub label: String,
    pub value: String,
}

/// Text shown to agents for an empty cell
pub const EMPTY_PLACEHOLDER: &str = "-";

pub(crate) fn agent_text(cell: &CellValue) -> String {
    if cell.is_blank() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        cell.display()
    }
}

impl VehicleRecord {
    pub fn to_document(&self, collection: &str) -> StoreResult<Document> {
        to_document(collection, &self.id, self)
    }

    pub fn from_document(collection: &str, id: &str, document: Document) -> StoreResult<Self> {
        from_document(collection, id, document)
    }

    pub fn field(&self, field_name: &str) -> Option<&CellValue> {
        self.fields.get(field_name)
    }

    /// What an agent sees: the registration number, then every visible column
    /// other than the registration column, in sheet order
    pub fn agent_view(&self, list: &ListMetadata) -> Vec<AgentField> {
        let mut view = vec![AgentField {
            label: list.identifier_column_name.clone(),
            value: self.vehicle_number.clone(),
        }];

        view.extend(
            list.columns
                .visible()
                .filter(|column| column.index != list.identifier_column)
                .map(|column| AgentField {
                    label: column.display_name.clone(),
                    value: self
                        .field(&column.field_name)
                        .map_or_else(|| EMPTY_PLACEHOLDER.to_string(), agent_text),
                }),
        );

        view
    }
}

/// Last four characters of `identifier`, or all of it when shorter
pub fn last_four(identifier: &str) -> String {
    let len = identifier.chars().count();
    identifier.chars().skip(len.saturating_sub(4)).collect()
}

/// Records built for one ingest, with how many keys were already stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltRecords {
    pub records: Vec<VehicleRecord>,
    pub new_count: usize,
    pub updated_count: usize,
}

/// Turns accepted rows into records for one list
#[derive(Debug, Clone)]
pub struct RecordBuilder<'a> {
    layout: &'a ColumnLayout,
    identifier_column: usize,
    list_id: &'a str,
    timestamp: DateTime<Utc>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        layout: &'a ColumnLayout,
        identifier_column: usize,
        list_id: &'a str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            layout,
            identifier_column,
            list_id,
            timestamp,
        }
    }

    /// Build the record for the accepted row at `row_index`
    ///
    /// The identifier cell is expected to be cleaned already. Blank or missing
    /// cells are stored as empty strings.
    pub fn build_row(&self, row_index: usize, row: &[CellValue]) -> VehicleRecord {
        let vehicle_number = row
            .get(self.identifier_column)
            .map(CellValue::display)
            .unwrap_or_default();

        let fields = self
            .layout
            .columns()
            .iter()
            .map(|column| {
                let value = match row.get(column.index) {
                    Some(cell) if !cell.is_blank() => cell.clone(),
                    _ => CellValue::Text(String::new()),
                };
                (column.field_name.clone(), value)
            })
            .collect();

        VehicleRecord {
            id: vehicle_number.clone(),
            last_four_digits: last_four(&vehicle_number),
            vehicle_number,
            list_parent_id: self.list_id.to_string(),
            row_index,
            created_at: self.timestamp,
            updated_at: self.timestamp,
            show_to_agent: true,
            fields,
        }
    }

    /// Build records for every accepted row, in order
    pub fn build(&self, rows: &[Vec<CellValue>]) -> Vec<VehicleRecord> {
        rows.iter()
            .enumerate()
            .map(|(row_index, row)| self.build_row(row_index, row))
            .collect()
    }

    /// Build records and reconcile them with what `collection` already holds
    ///
    /// Keys are deduplicated and read with one
    /// [`get_many`](DocumentStore::get_many) call. A key that is already
    /// stored keeps its `created_at` and counts as an update; a key repeated
    /// within the upload counts once as new.
    pub async fn build_resolved<S: DocumentStore + ?Sized>(
        &self,
        rows: &[Vec<CellValue>],
        store: &S,
        collection: &str,
    ) -> StoreResult<BuiltRecords> {
        let mut records = self.build(rows);

        let mut keys: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        keys.sort_unstable();
        keys.dedup();
        let stored = store.get_many(collection, &keys).await?;

        // stored keys only; the value is None when createdAt is unreadable
        let mut existing: BTreeMap<String, Option<DateTime<Utc>>> = keys
            .into_iter()
            .zip(stored)
            .filter_map(|(key, document)| document.map(|doc| (key, stored_created_at(&doc))))
            .collect();

        let mut seen: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let mut new_count = 0;
        let mut updated_count = 0;

        for record in &mut records {
            if let Some(created_at) = seen.get(&record.id) {
                record.created_at = *created_at;
                updated_count += 1;
                continue;
            }

            match existing.remove(&record.id) {
                Some(created_at) => {
                    if let Some(created_at) = created_at {
                        record.created_at = created_at;
                    }
                    updated_count += 1;
                },
                None => new_count += 1,
            }
            seen.insert(record.id.clone(), record.created_at);
        }

        debug!(
            list_id = %self.list_id,
            new = new_count,
            updated = updated_count,
            "Resolved vehicle records against store"
        );

        Ok(BuiltRecords {
            records,
            new_count,
            updated_count,
        })
    }
}

fn stored_created_at(document: &Document) -> Option<DateTime<Utc>> {
    document
        .get(CREATED_AT_FIELD)
        .and_then(|value| value.as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}
