//! Column layout
//!
//! Maps every sheet column to the storage key its values are written under.
//! Keys are derived once per ingest from the header names and then reused for
//! every row.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use vlist_common::types::ColumnHeader;

use crate::record::RESERVED_FIELDS;

#[allow(clippy::expect_used)]
static INVALID_FIELD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_]+").expect("field char class is a valid regex"));

#[allow(clippy::expect_used)]
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("underscore run is a valid regex"));

/// Turn a display name into a storage-safe key
///
/// Every run of characters outside `[A-Za-z0-9_]` becomes one underscore,
/// underscore runs collapse, leading and trailing underscores are dropped and
/// the result is lowercased. May return an empty string.
pub fn sanitize_field_name(display_name: &str) -> String {
    let replaced = INVALID_FIELD_CHARS.replace_all(display_name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_lowercase()
}

/// One sheet column as stored in the list metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Position in the uploaded grid
    pub index: usize,
    pub display_name: String,
    /// Key the column's values are stored under on each record
    pub field_name: String,
    pub visible_to_agent: bool,
}

/// Ordered column descriptors for one list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnLayout {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnLayout {
    /// Build the layout for `headers`, marking `agent_visible` indices visible
    ///
    /// Field names are unique within the layout and never shadow a fixed
    /// record field (in practice only `id`). A clash gets `_2`, `_3`, ...
    /// appended in header order; a name that sanitizes to nothing becomes
    /// `column_{n}` (1-based).
    pub fn new(headers: &[ColumnHeader], agent_visible: &[usize]) -> Self {
        let mut taken: HashSet<String> = RESERVED_FIELDS.iter().map(|f| f.to_string()).collect();
        let visible: HashSet<usize> = agent_visible.iter().copied().collect();

        let columns = headers
            .iter()
            .map(|header| {
                let mut base = sanitize_field_name(&header.name);
                if base.is_empty() {
                    base = format!("column_{}", header.index + 1);
                }

                let mut field_name = base.clone();
                let mut suffix = 2;
                while taken.contains(&field_name) {
                    field_name = format!("{base}_{suffix}");
                    suffix += 1;
                }
                taken.insert(field_name.clone());

                debug!(
                    column = header.index,
                    display_name = %header.name,
                    field_name = %field_name,
                    "Mapped column to field"
                );

                ColumnDescriptor {
                    index: header.index,
                    display_name: header.name.clone(),
                    field_name,
                    visible_to_agent: visible.contains(&header.index),
                }
            })
            .collect();

        Self { columns }
    }

    pub fn from_descriptors(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<ColumnDescriptor> {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.index == index)
    }

    /// Columns agents may see, in sheet order
    pub fn visible(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.visible_to_agent)
    }

    /// Toggle one column; returns false when no column has `index`
    pub fn set_visibility(&mut self, index: usize, visible: bool) -> bool {
        match self.columns.iter_mut().find(|c| c.index == index) {
            Some(column) => {
                column.visible_to_agent = visible;
                true
            },
            None => false,
        }
    }

    /// True when `other` describes the same columns, visibility aside
    pub fn same_shape(&self, other: &[ColumnDescriptor]) -> bool {
        self.columns.len() == other.len()
            && self
                .columns
                .iter()
                .zip(other)
                .all(|(a, b)| a.index == b.index && a.field_name == b.field_name)
    }
}
