//! Registration number normalization

use vlist_common::types::CellValue;

/// Canonical token for a raw registration string
///
/// Trims, uppercases, and drops everything that is not an ASCII letter or
/// digit. Pure and idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Normalize a cell; anything but non-empty text yields the empty string
pub fn normalize_cell(cell: &CellValue) -> String {
    cell.as_text().map(normalize).unwrap_or_default()
}
