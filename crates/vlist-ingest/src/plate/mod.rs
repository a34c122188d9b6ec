//! Vehicle registration numbers
//!
//! Cleaning and validation of registration numbers as they arrive from
//! spreadsheet cells ("dl 01 ab 1234", "DL-01-AB-1234", ...).
//!
//! - [`normalize`] strips formatting noise into an uppercase letter/digit token
//! - [`validate_identifier`] / [`validate_plate`] classify one value
//! - [`validate_plates`] summarises a plain list of values
//!
//! # Example
//!
//! ```
//! use vlist_ingest::plate::{validate_plate, PlateRejection};
//!
//! let outcome = validate_plate("dl 01 ab 1234");
//! assert!(outcome.is_valid);
//! assert_eq!(outcome.cleaned_value.as_deref(), Some("DL01AB1234"));
//!
//! let outcome = validate_plate("XX01AB1234");
//! assert_eq!(
//!     outcome.rejection,
//!     Some(PlateRejection::UnknownRegion { code: "XX".to_string() })
//! );
//! ```

pub mod normalize;
pub mod region;
pub mod validate;

pub use normalize::normalize;
pub use region::{is_region_code, REGION_CODES};
pub use validate::{
    validate_identifier, validate_plate, validate_plates, InvalidPlate, PlateBatchSummary,
    PlateRejection, ValidationOutcome, MAX_PLATE_LENGTH, MIN_PLATE_LENGTH,
};
