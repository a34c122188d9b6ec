//! VList Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the VList workspace.
//!
//! - **Error Handling**: [`VlistError`] and the [`Result`] alias
//! - **Logging**: subscriber setup in [`logging`]
//! - **Types**: spreadsheet cells and grids handed over by upload readers
//!
//! # Example
//!
//! ```
//! use vlist_common::types::{CellValue, RawGrid};
//!
//! let grid = RawGrid::from_json_str(r#"[["Vehicle No", "Owner"], ["DL01AB1234", "R. Singh"]]"#)?;
//! assert_eq!(grid.data_row_count(), 1);
//! assert_eq!(grid.cell(1, 0), &CellValue::from("DL01AB1234"));
//! # Ok::<(), vlist_common::VlistError>(())
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Result, VlistError};
