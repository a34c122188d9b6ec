//! Spreadsheet grid types
//!
//! Upload readers hand the core a rectangular-ish grid of untyped cells: row 0
//! is the header, every following row is data. Rows are not required to be as
//! wide as the header; missing trailing cells read as [`CellValue::Empty`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VlistError};

/// One untyped spreadsheet cell
///
/// Serialized untagged, so a grid round-trips through the JSON shape readers
/// emit (`null`, booleans, numbers, strings).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Borrow the text if this is a non-empty text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// True for `Empty` and for the empty string
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render the cell the way it reads in the sheet
    ///
    /// Whole numbers print without a fraction (`1234`, not `1234.0`).
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }

    fn from_json(value: &Value, row: usize, col: usize) -> Result<Self> {
        match value {
            Value::Null => Ok(CellValue::Empty),
            Value::Bool(b) => Ok(CellValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or_else(|| {
                VlistError::InvalidGrid(format!("number out of range at row {row}, column {col}"))
            }),
            Value::String(s) => Ok(CellValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(VlistError::InvalidGrid(format!(
                "nested value at row {row}, column {col}"
            ))),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// One grid row
pub type Row = Vec<CellValue>;

/// Header row plus data rows, as read from the first worksheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawGrid {
    rows: Vec<Row>,
}

impl RawGrid {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Parse the array-of-arrays JSON that sheet readers produce
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(raw_rows) = value else {
            return Err(VlistError::InvalidGrid("expected an array of rows".to_string()));
        };

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_idx, raw_row) in raw_rows.iter().enumerate() {
            let Value::Array(cells) = raw_row else {
                return Err(VlistError::InvalidGrid(format!("row {row_idx} is not an array")));
            };
            let row = cells
                .iter()
                .enumerate()
                .map(|(col_idx, cell)| CellValue::from_json(cell, row_idx, col_idx))
                .collect::<Result<Row>>()?;
            rows.push(row);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows after the header
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Width of the header row, the column index space for every row
    pub fn width(&self) -> usize {
        self.header().map_or(0, Vec::len)
    }

    /// Cell at `(row, col)`, `Empty` when the row is short or missing
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }
}

impl From<Vec<Row>> for RawGrid {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

/// A header cell with its position, as offered to the column pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    pub index: usize,
    pub name: String,
}

impl ColumnHeader {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Headers of `grid`; blank header cells are named `Column {n}` (1-based)
pub fn column_headers(grid: &RawGrid) -> Vec<ColumnHeader> {
    grid.header()
        .map(|header| {
            header
                .iter()
                .enumerate()
                .map(|(index, cell)| {
                    let name = cell.display();
                    if name.trim().is_empty() {
                        ColumnHeader::new(index, format!("Column {}", index + 1))
                    } else {
                        ColumnHeader::new(index, name)
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}
