use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DocumentError;
use crate::slots::{Slot, SlotId, SlotStore};

/// Highest document schema this crate reads and the one it writes.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            page_name: None,
            updated_at: None,
            extra: BTreeMap::new(),
        }
    }
}

impl DocumentMetadata {
    pub fn named(page_name: &str) -> Self {
        Self {
            page_name: Some(page_name.to_string()),
            ..Self::default()
        }
    }
}

/// The persisted unit: every slot, the root order and page metadata.
///
/// ```json
/// { "slots": { "<id>": { ...slot record... } }, "rootSlots": ["<id>"], "metadata": { "schemaVersion": 1 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDocument {
    #[serde(default)]
    pub slots: BTreeMap<SlotId, Slot>,
    #[serde(default)]
    pub root_slots: Vec<SlotId>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl ConfigurationDocument {
    pub fn from_store(store: &SlotStore, metadata: DocumentMetadata) -> Self {
        Self {
            slots: store.slots.clone(),
            root_slots: store.root_slots.clone(),
            metadata,
        }
    }

    /// Validate and split into a slot store plus metadata.
    pub fn into_store(self) -> Result<(SlotStore, DocumentMetadata), DocumentError> {
        if self.metadata.schema_version > SCHEMA_VERSION {
            return Err(DocumentError::UnsupportedSchema {
                found: self.metadata.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        let store = SlotStore::from_parts(self.slots, self.root_slots)?;
        Ok((store, self.metadata))
    }

    /// Checks the tree without consuming the document.
    pub fn validate(&self) -> Result<(), DocumentError> {
        self.clone().into_store().map(|_| ())
    }

    /// SHA-256 over the slot tree only, so metadata such as timestamps never
    /// marks a page as changed.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&(&self.slots, &self.root_slots)).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

impl SlotStore {
    pub fn to_document(&self, metadata: DocumentMetadata) -> ConfigurationDocument {
        ConfigurationDocument::from_store(self, metadata)
    }

    pub fn from_document(document: ConfigurationDocument) -> Result<Self, DocumentError> {
        document.into_store().map(|(store, _)| store)
    }
}
