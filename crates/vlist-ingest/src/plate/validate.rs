//! Registration number validation
//!
//! A value is checked in a fixed order and the first failing check decides
//! the rejection:
//!
//! 1. present (non-empty text)
//! 2. non-empty after [`normalize`]
//! 3. length within [`MIN_PLATE_LENGTH`]..=[`MAX_PLATE_LENGTH`]
//! 4. region prefix in [`REGION_CODES`](super::REGION_CODES)
//! 5. matches one of the plate grammars
//!
//! Every rejection after step 2 still carries the cleaned value so callers can
//! show what was attempted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;
use vlist_common::types::CellValue;

use super::normalize::normalize;
use super::region::is_region_code;

/// Shortest accepted cleaned value
pub const MIN_PLATE_LENGTH: usize = 8;

/// Longest accepted cleaned value
pub const MAX_PLATE_LENGTH: usize = 15;

/// Plate grammars, most specific first:
/// `DL01AB1234`, `DL01A1234`, `DL011234`, and the older `DLFAPATW00347`
const PLATE_GRAMMARS: [&str; 4] = [
    r"^[A-Z]{2}[0-9]{2}[A-Z]{2}[0-9]{4}$",
    r"^[A-Z]{2}[0-9]{2}[A-Z][0-9]{4}$",
    r"^[A-Z]{2}[0-9]{2}[0-9]{4}$",
    r"^[A-Z]{2}[A-Z]{2,}[A-Z0-9]{2}[0-9]{4,5}$",
];

#[allow(clippy::expect_used)]
static PLATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PLATE_GRAMMARS
        .iter()
        .map(|grammar| Regex::new(grammar).expect("plate grammar is a valid regex"))
        .collect()
});

/// Why a value was not accepted as a registration number
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlateRejection {
    #[error("Vehicle number is required")]
    Required,

    #[error("Vehicle number is empty after cleaning")]
    EmptyAfterCleaning,

    #[error("Vehicle number too short after cleaning")]
    TooShort { length: usize },

    #[error("Vehicle number too long after cleaning")]
    TooLong { length: usize },

    #[error("Invalid state code: {code}. Must be a valid Indian state code.")]
    UnknownRegion { code: String },

    #[error("Invalid vehicle number format. Must follow Indian RTO standards.")]
    InvalidFormat,
}

/// Result of validating one value
///
/// `cleaned_value` is absent only for [`PlateRejection::Required`] and
/// [`PlateRejection::EmptyAfterCleaning`]; `rejection` and `error_reason` are
/// present iff `is_valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_value: Option<String>,
    /// Human-readable rejection reason, the display form of `rejection`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PlateRejection>,
}

impl ValidationOutcome {
    fn valid(cleaned: String) -> Self {
        Self {
            is_valid: true,
            cleaned_value: Some(cleaned),
            error_reason: None,
            rejection: None,
        }
    }

    fn invalid(cleaned: Option<String>, rejection: PlateRejection) -> Self {
        Self {
            is_valid: false,
            cleaned_value: cleaned,
            error_reason: Some(rejection.to_string()),
            rejection: Some(rejection),
        }
    }
}

/// Validate one spreadsheet cell
///
/// Only non-empty text can be a registration number; every other cell is
/// rejected as [`PlateRejection::Required`].
pub fn validate_identifier(raw: &CellValue) -> ValidationOutcome {
    match raw.as_text() {
        Some(text) => validate_plate(text),
        None => ValidationOutcome::invalid(None, PlateRejection::Required),
    }
}

/// Validate one raw registration string
pub fn validate_plate(raw: &str) -> ValidationOutcome {
    if raw.is_empty() {
        return ValidationOutcome::invalid(None, PlateRejection::Required);
    }

    let cleaned = normalize(raw);
    if cleaned.is_empty() {
        return ValidationOutcome::invalid(None, PlateRejection::EmptyAfterCleaning);
    }

    let length = cleaned.len();
    if length < MIN_PLATE_LENGTH {
        return ValidationOutcome::invalid(Some(cleaned), PlateRejection::TooShort { length });
    }
    if length > MAX_PLATE_LENGTH {
        return ValidationOutcome::invalid(Some(cleaned), PlateRejection::TooLong { length });
    }

    // cleaned is ASCII, so byte slicing is char slicing
    let region = &cleaned[..2];
    if !is_region_code(region) {
        let code = region.to_string();
        return ValidationOutcome::invalid(Some(cleaned), PlateRejection::UnknownRegion { code });
    }

    if PLATE_PATTERNS.iter().any(|pattern| pattern.is_match(&cleaned)) {
        ValidationOutcome::valid(cleaned)
    } else {
        ValidationOutcome::invalid(Some(cleaned), PlateRejection::InvalidFormat)
    }
}

/// One rejected value with the position it was found at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidPlate {
    /// 1-based position shown to the user
    pub row_number: usize,
    pub original_value: String,
    /// Best-effort cleaned value, empty when nothing survived cleaning
    pub cleaned_value: String,
    pub error_reason: String,
    pub rejection: PlateRejection,
}

impl InvalidPlate {
    pub fn new(
        row_number: usize,
        original_value: impl Into<String>,
        cleaned_value: Option<String>,
        rejection: PlateRejection,
    ) -> Self {
        Self {
            row_number,
            original_value: original_value.into(),
            cleaned_value: cleaned_value.unwrap_or_default(),
            error_reason: rejection.to_string(),
            rejection,
        }
    }

    pub fn reason(&self) -> &str {
        &self.error_reason
    }
}

/// Outcome of validating a plain list of values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateBatchSummary {
    pub total_count: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Cleaned values of the accepted entries, in input order
    pub cleaned_numbers: Vec<String>,
    pub invalid_numbers: Vec<InvalidPlate>,
}

/// Validate every value of `values`; positions are 1-based
pub fn validate_plates<S: AsRef<str>>(values: &[S]) -> PlateBatchSummary {
    let mut summary = PlateBatchSummary {
        total_count: values.len(),
        ..Default::default()
    };

    for (idx, value) in values.iter().enumerate() {
        let original = value.as_ref();
        let outcome = validate_plate(original);
        match (outcome.cleaned_value, outcome.rejection) {
            (Some(cleaned), None) => summary.cleaned_numbers.push(cleaned),
            (cleaned, rejection) => summary.invalid_numbers.push(InvalidPlate::new(
                idx + 1,
                original,
                cleaned,
                rejection.unwrap_or(PlateRejection::InvalidFormat),
            )),
        }
    }

    summary.valid_count = summary.cleaned_numbers.len();
    summary.invalid_count = summary.invalid_numbers.len();
    summary
}
