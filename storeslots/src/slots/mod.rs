pub mod mutator;
pub mod registry;
pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use registry::SlotType;
pub use store::SlotStore;

/// Opaque slot identifier, stable for the lifetime of the slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id of the form `<type-tag>-<8 hex chars>`.
    pub fn generate(slot_type: &SlotType) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", slot_type.tag(), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Class name plus inline style overrides. Both halves are optional and
/// overridden independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStyles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(rename = "styles", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inline: BTreeMap<String, String>,
}

impl SlotStyles {
    pub fn with_class(class_name: &str) -> Self {
        Self {
            class_name: Some(class_name.to_string()),
            inline: BTreeMap::new(),
        }
    }

    pub fn with_inline(mut self, key: &str, value: &str) -> Self {
        self.inline.insert(key.to_string(), value.to_string());
        self
    }

    pub fn inline_css(&self) -> String {
        inline_css(&self.inline)
    }
}

/// `key: value;` pairs in key order, ready for a `style` attribute.
pub fn inline_css(declarations: &BTreeMap<String, String>) -> String {
    declarations
        .iter()
        .map(|(k, v)| format!("{}: {};", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Descriptive fields that never change what a slot renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ── Slot record (wire shape of one entry in `slots`) ────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub styles: SlotStyles,
    #[serde(default)]
    pub parent_id: Option<SlotId>,
    #[serde(default)]
    pub children: Vec<SlotId>,
    #[serde(default)]
    pub metadata: SlotMetadata,
}

impl Slot {
    /// A detached slot carrying its type's defaults.
    pub fn new(id: SlotId, slot_type: SlotType) -> Self {
        Self {
            id,
            content: slot_type.default_content().to_string(),
            styles: slot_type.default_styles(),
            metadata: SlotMetadata {
                name: Some(slot_type.label().to_string()),
                extra: BTreeMap::new(),
            },
            slot_type,
            parent_id: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn display_name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .unwrap_or_else(|| self.slot_type.label())
    }
}
