//! List metadata
//!
//! One document per uploaded sheet, keyed by the generated list id. It owns
//! the canonical column layout; vehicle records only point back to it through
//! `listParentId`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::columns::ColumnLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    Active,
    Inactive,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Active => "active",
            ListStatus::Inactive => "inactive",
        }
    }

    /// The other status, as the dashboard toggle flips it
    pub fn toggled(self) -> Self {
        match self {
            ListStatus::Active => ListStatus::Inactive,
            ListStatus::Inactive => ListStatus::Active,
        }
    }
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(ListStatus::Active),
            "inactive" => Ok(ListStatus::Inactive),
            other => Err(format!("Unknown list status: {other}")),
        }
    }
}

/// Stored description of one ingested list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    pub id: String,
    pub file_name: String,
    pub identifier_column: usize,
    pub identifier_column_name: String,
    pub columns: ColumnLayout,
    pub total_records: usize,
    pub upload_date: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub status: ListStatus,
}

/// Id for a list uploaded from `file_name` at `now`
///
/// Every character outside ASCII letters and digits becomes `_`, then the
/// UTC upload date is appended as `_YYYYMMDD`. Uploading the same file twice
/// on one day therefore targets the same list.
pub fn list_id_for(file_name: &str, now: DateTime<Utc>) -> String {
    let stem: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}_{}", now.format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_list_id_for() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 23, 59, 0).unwrap();
        assert_eq!(list_id_for("March Repo.xlsx", now), "March_Repo_xlsx_20240307");
        assert_eq!(list_id_for("ab-cd(1).xls", now), "ab_cd_1__xls_20240307");
    }

    #[test]
    fn test_status_parse_and_toggle() {
        assert_eq!("Active".parse::<ListStatus>().unwrap(), ListStatus::Active);
        assert_eq!(" inactive ".parse::<ListStatus>().unwrap(), ListStatus::Inactive);
        assert!("paused".parse::<ListStatus>().is_err());
        assert_eq!(ListStatus::Active.toggled(), ListStatus::Inactive);
        assert_eq!(ListStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_missing_status_defaults_to_active() {
        let json = serde_json::json!({
            "id": "a_20240101",
            "fileName": "a",
            "identifierColumn": 0,
            "identifierColumnName": "Vehicle No",
            "columns": [],
            "totalRecords": 0,
            "uploadDate": "2024-01-01T00:00:00Z",
            "createdBy": "admin"
        });

        let metadata: ListMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata.status, ListStatus::Active);
        assert!(metadata.columns.is_empty());
    }
}
