use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use storeslots::persistence::{ConfigKey, ConfigurationDocument, StoredConfiguration};
use utoipa::ToSchema;

// ── Database rows ────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
pub struct ConfigurationRow {
    pub document: Json<ConfigurationDocument>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl ConfigurationRow {
    pub fn into_stored(self, key: &ConfigKey) -> StoredConfiguration {
        StoredConfiguration {
            store_id: key.store_id.clone(),
            page_type: key.page_type,
            variant: key.variant,
            version: self.version,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
            configuration: self.document.0,
        }
    }
}

// ── API types ────────────────────────────────────────────────────────────────

/// A stored page configuration with its version stamp.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResponse {
    pub store_id: String,
    /// cart, checkout, product, category, home or success
    pub page_type: String,
    /// draft or published
    pub variant: String,
    /// Starts at 1, increases by one per write
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    /// `{ slots, rootSlots, metadata }`
    #[schema(value_type = Object)]
    pub configuration: ConfigurationDocument,
}

impl From<StoredConfiguration> for ConfigurationResponse {
    fn from(stored: StoredConfiguration) -> Self {
        Self {
            store_id: stored.store_id,
            page_type: stored.page_type.to_string(),
            variant: stored.variant.to_string(),
            version: stored.version,
            updated_at: stored.updated_at,
            updated_by: stored.updated_by,
            configuration: stored.configuration,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftBody {
    #[schema(value_type = Object)]
    pub configuration: ConfigurationDocument,
    /// Version the editor last loaded. 0 means "only if no draft exists";
    /// omit to overwrite unconditionally.
    pub expected_version: Option<i64>,
}
