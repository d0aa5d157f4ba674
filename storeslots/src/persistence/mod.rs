pub mod adapter;
pub mod api_client;
pub mod baseline;
pub mod document;
pub mod memory;
pub mod watch;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceResult;

pub use adapter::{ConfigurationAdapter, DraftOrigin, LoadedConfiguration};
pub use api_client::ApiClient;
pub use baseline::Baseline;
pub use document::{ConfigurationDocument, DocumentMetadata, SCHEMA_VERSION};
pub use memory::MemoryBackend;

// ── Keys ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cart,
    Checkout,
    Product,
    Category,
    Home,
    Success,
}

impl PageType {
    pub const ALL: [PageType; 6] = [
        PageType::Cart,
        PageType::Checkout,
        PageType::Product,
        PageType::Category,
        PageType::Home,
        PageType::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Cart => "cart",
            PageType::Checkout => "checkout",
            PageType::Product => "product",
            PageType::Category => "category",
            PageType::Home => "home",
            PageType::Success => "success",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown page type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Draft,
    Published,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Draft => "draft",
            Variant::Published => "published",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one stored configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub store_id: String,
    pub page_type: PageType,
    pub variant: Variant,
}

impl ConfigKey {
    pub fn new(store_id: &str, page_type: PageType, variant: Variant) -> Self {
        Self {
            store_id: store_id.to_string(),
            page_type,
            variant,
        }
    }

    pub fn draft(store_id: &str, page_type: PageType) -> Self {
        Self::new(store_id, page_type, Variant::Draft)
    }

    pub fn published(store_id: &str, page_type: PageType) -> Self {
        Self::new(store_id, page_type, Variant::Published)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.store_id, self.page_type, self.variant)
    }
}

/// Store ids are path segments and database keys.
pub fn is_valid_store_id(store_id: &str) -> bool {
    !store_id.is_empty()
        && store_id.len() <= 64
        && store_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// ── Wire types shared with the configuration service ────────────────────────

/// A configuration document as held by a backend, with its version stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfiguration {
    pub store_id: String,
    pub page_type: PageType,
    pub variant: Variant,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub configuration: ConfigurationDocument,
}

impl StoredConfiguration {
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(&self.store_id, self.page_type, self.variant)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub configuration: ConfigurationDocument,
    /// Conditional save: the version the caller last saw. `Some(0)` means
    /// "only if no draft exists yet"; `None` overwrites unconditionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

/// Change notifications pushed to editors of the same store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ConfigEvent {
    DraftSaved {
        page_type: PageType,
        version: i64,
        updated_by: Option<String>,
    },
    Published {
        page_type: PageType,
        version: i64,
        updated_by: Option<String>,
    },
    DraftDiscarded {
        page_type: PageType,
        updated_by: Option<String>,
    },
    Error {
        message: String,
    },
}

// ── Backend seam ────────────────────────────────────────────────────────────

/// Where configuration documents live. Implemented by the HTTP client and by
/// the in-memory backend.
pub trait ConfigurationBackend {
    /// `Ok(None)` when nothing is stored under `key`.
    fn fetch(
        &self,
        key: &ConfigKey,
    ) -> impl Future<Output = PersistenceResult<Option<StoredConfiguration>>> + Send;

    /// Overwrite the draft for (store, page). See [`SaveDraftRequest`] for
    /// the meaning of `expected_version`.
    fn save_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send;

    /// Copy the current draft over the published variant.
    fn publish(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send;

    /// Drop the draft. `Ok(false)` when there was none.
    fn discard_draft(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<bool>> + Send;
}
