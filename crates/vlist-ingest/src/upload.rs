//! Upload checks and the agent preview
//!
//! Everything here runs before a single write is issued.

use serde::{Deserialize, Serialize};
use vlist_common::types::{column_headers, RawGrid};

use crate::config::IngestSettings;
use crate::error::InputError;
use crate::record::agent_text;

/// Rows shown by the column picker's agent preview
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Reject uploads that cannot produce a list
///
/// Checks, in order: file name present, allowed extension, at least one data
/// row, identifier column inside the header, agent columns inside the header.
pub fn check_upload(
    settings: &IngestSettings,
    file_name: &str,
    grid: &RawGrid,
    identifier_column: usize,
    agent_columns: &[usize],
) -> Result<(), InputError> {
    if file_name.trim().is_empty() {
        return Err(InputError::EmptyFileName);
    }

    if !settings.accepts_file(file_name) {
        return Err(InputError::UnsupportedFileType {
            file_name: file_name.to_string(),
            allowed: settings.allowed_extensions.join(", "),
        });
    }

    if grid.data_row_count() == 0 {
        return Err(InputError::EmptySheet);
    }

    let width = grid.width();
    if identifier_column >= width {
        return Err(InputError::IdentifierColumnOutOfRange {
            index: identifier_column,
            width,
        });
    }

    if let Some(&index) = agent_columns.iter().find(|&&index| index >= width) {
        return Err(InputError::AgentColumnOutOfRange { index, width });
    }

    Ok(())
}

/// First rows of a sheet as agents would see them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Preview the agent view of `grid` before ingest
///
/// The identifier column comes first, followed by the agent columns in the
/// order given (the identifier column is not repeated). At most `limit` data
/// rows are shown, values as they appear in the sheet and blanks as `-`.
/// Columns outside the header are skipped.
pub fn preview_agent_view(
    grid: &RawGrid,
    identifier_column: usize,
    agent_columns: &[usize],
    limit: usize,
) -> AgentPreview {
    let headers = column_headers(grid);
    let order: Vec<usize> = std::iter::once(identifier_column)
        .chain(agent_columns.iter().copied().filter(|&i| i != identifier_column))
        .filter(|&i| i < headers.len())
        .collect();

    AgentPreview {
        headers: order.iter().map(|&i| headers[i].name.clone()).collect(),
        rows: (1..=grid.data_row_count().min(limit))
            .map(|row| order.iter().map(|&col| agent_text(grid.cell(row, col))).collect())
            .collect(),
    }
}
