//! Grid classification
//!
//! Splits an uploaded grid into rows whose registration number is valid
//! (kept, with the number replaced by its cleaned form) and rows that are
//! rejected (reported with a reason). The header row is always kept.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vlist_common::types::{CellValue, RawGrid};

use crate::plate::{validate_plate, InvalidPlate, PlateRejection};

/// Accepted rows plus diagnostics for the rejected ones
///
/// Invariants: `valid_count + invalid_count` equals the number of data rows
/// of the input, and `cleaned_data` holds the header plus `valid_count` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedGrid {
    pub cleaned_data: RawGrid,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Rejected rows in sheet order; `row_number` is the sheet row (header = 1)
    pub invalid_rows: Vec<InvalidPlate>,
}

impl ClassifiedGrid {
    /// Accepted data rows, header excluded
    pub fn accepted_rows(&self) -> &[Vec<CellValue>] {
        self.cleaned_data.data_rows()
    }

    pub fn total_rows(&self) -> usize {
        self.valid_count + self.invalid_count
    }
}

/// Classify every data row of `grid` on its `identifier_column` cell
///
/// The cell is read as it displays in the sheet, so a numeric cell is
/// validated as its digits. Rows are independent; output order follows the
/// input order.
pub fn classify_grid(grid: &RawGrid, identifier_column: usize) -> ClassifiedGrid {
    let mut cleaned_data = RawGrid::default();
    let mut invalid_rows = Vec::new();

    if let Some(header) = grid.header() {
        cleaned_data.push(header.clone());
    }

    for (offset, row) in grid.data_rows().iter().enumerate() {
        let row_number = offset + 2;
        let original_value = grid.cell(offset + 1, identifier_column).display();
        let outcome = validate_plate(&original_value);

        match (outcome.cleaned_value, outcome.rejection) {
            (Some(cleaned), None) => {
                let mut cleaned_row = row.clone();
                if cleaned_row.len() <= identifier_column {
                    cleaned_row.resize(identifier_column + 1, CellValue::Empty);
                }
                cleaned_row[identifier_column] = CellValue::Text(cleaned);
                cleaned_data.push(cleaned_row);
            },
            (cleaned, rejection) => {
                let rejection = rejection.unwrap_or(PlateRejection::InvalidFormat);
                debug!(
                    row = row_number,
                    original = %original_value,
                    reason = %rejection,
                    "Rejected vehicle number"
                );
                invalid_rows.push(InvalidPlate::new(
                    row_number,
                    original_value,
                    cleaned,
                    rejection,
                ));
            },
        }
    }

    let valid_count = cleaned_data.data_row_count();
    let invalid_count = invalid_rows.len();

    info!(
        total = grid.data_row_count(),
        valid = valid_count,
        invalid = invalid_count,
        "Vehicle number validation complete"
    );

    ClassifiedGrid {
        cleaned_data,
        valid_count,
        invalid_count,
        invalid_rows,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plate::validate_identifier;
    use proptest::prelude::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    fn sample_grid() -> RawGrid {
        RawGrid::new(vec![
            row(&["Owner", "Vehicle No", "Model"]),
            row(&["Asha", "dl 01 ab 1234", "Swift"]),
            row(&["Ben", "XX01AB1234", "Alto"]),
            row(&["Chen", "MH-12-DE-1433", "City"]),
            row(&["Dev", "KA05 1234", "Nano"]),
            row(&["Eli", "", "Zen"]),
            row(&["Fay", "UP32AB0001", "i20"]),
            row(&["Gus", "TN 09 Z 4321", "Polo"]),
        ])
    }

    #[test]
    fn test_five_valid_two_invalid() {
        let result = classify_grid(&sample_grid(), 1);

        assert_eq!(result.valid_count, 5);
        assert_eq!(result.invalid_count, 2);
        assert_eq!(result.invalid_rows.len(), 2);
        assert_eq!(result.cleaned_data.len(), 6);
        assert_eq!(result.total_rows(), 7);
    }

    #[test]
    fn test_header_is_kept_and_identifier_is_cleaned() {
        let result = classify_grid(&sample_grid(), 1);

        assert_eq!(result.cleaned_data.header(), sample_grid().header());
        assert_eq!(result.accepted_rows()[0], row(&["Asha", "DL01AB1234", "Swift"]));
        assert_eq!(result.accepted_rows()[1][1], CellValue::from("MH12DE1433"));
        // untouched columns are copied verbatim
        assert_eq!(result.accepted_rows()[4][2], CellValue::from("Polo"));
    }

    #[test]
    fn test_invalid_rows_carry_sheet_row_numbers_and_reasons() {
        let result = classify_grid(&sample_grid(), 1);

        let first = &result.invalid_rows[0];
        assert_eq!(first.row_number, 3);
        assert_eq!(first.original_value, "XX01AB1234");
        assert_eq!(first.cleaned_value, "XX01AB1234");
        assert!(first.reason().contains("XX"));

        let second = &result.invalid_rows[1];
        assert_eq!(second.row_number, 6);
        assert_eq!(second.cleaned_value, "");
        assert_eq!(second.rejection, PlateRejection::Required);
    }

    #[test]
    fn test_invalid_rows_serialize_with_reason() {
        let grid = RawGrid::new(vec![row(&["Vehicle No"]), row(&["DL0112"])]);
        let json = serde_json::to_value(classify_grid(&grid, 0)).unwrap();

        let rejected = &json["invalidRows"][0];
        assert_eq!(rejected["rowNumber"], 2);
        assert_eq!(rejected["originalValue"], "DL0112");
        assert_eq!(rejected["errorReason"], "Vehicle number too short after cleaning");
        assert_eq!(json["validCount"], 0);
        assert_eq!(json["invalidCount"], 1);
    }

    #[test]
    fn test_numeric_and_missing_cells() {
        let grid = RawGrid::new(vec![
            row(&["Vehicle No", "Note"]),
            vec![CellValue::Number(12345678.0)],
            vec![],
        ]);

        let result = classify_grid(&grid, 0);
        assert_eq!(result.valid_count, 0);
        assert_eq!(result.invalid_rows[0].original_value, "12345678");
        assert!(matches!(
            result.invalid_rows[0].rejection,
            PlateRejection::UnknownRegion { .. }
        ));
        assert_eq!(result.invalid_rows[1].rejection, PlateRejection::Required);
    }

    #[test]
    fn test_short_row_is_padded_to_identifier_column() {
        let grid = RawGrid::new(vec![row(&["A", "B", "Vehicle No"]), row(&["x", "y", "DL01AB1234"])]);
        let result = classify_grid(&grid, 2);
        assert_eq!(result.accepted_rows()[0].len(), 3);
    }

    #[test]
    fn test_empty_and_header_only_grids() {
        let empty = classify_grid(&RawGrid::default(), 0);
        assert!(empty.cleaned_data.is_empty());
        assert_eq!(empty.total_rows(), 0);

        let header_only = classify_grid(&RawGrid::new(vec![row(&["Vehicle No"])]), 0);
        assert_eq!(header_only.cleaned_data.len(), 1);
        assert_eq!(header_only.valid_count, 0);
    }

    proptest! {
        #[test]
        fn prop_counts_add_up(values in proptest::collection::vec("[A-Za-z0-9 ]{0,14}", 0..40)) {
            let mut rows = vec![row(&["Vehicle No"])];
            rows.extend(values.iter().map(|v| row(&[v.as_str()])));
            let grid = RawGrid::new(rows);

            let result = classify_grid(&grid, 0);
            prop_assert_eq!(result.valid_count + result.invalid_count, grid.len() - 1);
            prop_assert_eq!(result.cleaned_data.len(), result.valid_count + 1);

            for accepted in result.accepted_rows() {
                prop_assert!(validate_identifier(&accepted[0]).is_valid);
            }
        }
    }
}
