//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Default number of records per atomic write batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Largest batch size any supported backend accepts.
pub const MAX_BATCH_SIZE: usize = 500;

/// Default collection holding list metadata.
pub const DEFAULT_LISTS_COLLECTION: &str = "lists";

/// Default collection holding vehicle records.
pub const DEFAULT_VEHICLES_COLLECTION: &str = "vehicleno";

/// Default author recorded on new lists.
pub const DEFAULT_CREATED_BY: &str = "admin";

/// Default accepted upload extensions.
pub const DEFAULT_ALLOWED_EXTENSIONS: &str = "xlsx,xls";

/// Ingest settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub lists_collection: String,
    pub vehicles_collection: String,
    pub created_by: String,
    /// Lowercase extensions without the dot
    pub allowed_extensions: Vec<String>,
}

impl IngestSettings {
    /// Load settings from the environment (and `.env`) over the defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = IngestSettings {
            batch_size: lookup("VLIST_BATCH_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
            lists_collection: lookup("VLIST_LISTS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_LISTS_COLLECTION.to_string()),
            vehicles_collection: lookup("VLIST_VEHICLES_COLLECTION")
                .unwrap_or_else(|| DEFAULT_VEHICLES_COLLECTION.to_string()),
            created_by: lookup("VLIST_CREATED_BY").unwrap_or_else(|| DEFAULT_CREATED_BY.to_string()),
            allowed_extensions: parse_extensions(
                &lookup("VLIST_ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
            ),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!(
                "Batch size must be between 1 and {} (got {})",
                MAX_BATCH_SIZE,
                self.batch_size
            );
        }

        if self.lists_collection.trim().is_empty() {
            anyhow::bail!("Lists collection name cannot be empty");
        }

        if self.vehicles_collection.trim().is_empty() {
            anyhow::bail!("Vehicles collection name cannot be empty");
        }

        if self.lists_collection == self.vehicles_collection {
            anyhow::bail!(
                "Lists and vehicles must live in different collections (both are '{}')",
                self.lists_collection
            );
        }

        if self.allowed_extensions.is_empty() {
            anyhow::bail!("At least one upload extension must be allowed");
        }

        if self.created_by.trim().is_empty() {
            tracing::warn!("No list author configured - lists will have an empty created_by");
        }

        Ok(())
    }

    /// True when `file_name` ends in one of the allowed extensions
    pub fn accepts_file(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .is_some_and(|ext| self.allowed_extensions.iter().any(|allowed| *allowed == ext))
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            lists_collection: DEFAULT_LISTS_COLLECTION.to_string(),
            vehicles_collection: DEFAULT_VEHICLES_COLLECTION.to_string(),
            created_by: DEFAULT_CREATED_BY.to_string(),
            allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
        }
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
