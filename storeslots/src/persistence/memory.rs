use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::error::{PersistenceError, PersistenceResult};

use super::{
    ConfigKey, ConfigurationBackend, ConfigurationDocument, PageType, StoredConfiguration,
    Variant,
};

#[derive(Default)]
struct Entries {
    live: HashMap<ConfigKey, StoredConfiguration>,
    /// Last version of every removed key. A key that comes back continues
    /// from here so a stale `expected_version` can never match again.
    retired: HashMap<ConfigKey, i64>,
}

/// Process-local configuration storage with the same versioning rules as
/// the configuration service. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &ConfigKey) -> Option<StoredConfiguration> {
        self.entries().live.get(key).cloned()
    }

    /// Write `document` under `key`, enforcing `expected_version`.
    pub fn put(
        &self,
        key: &ConfigKey,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
        updated_by: Option<&str>,
    ) -> PersistenceResult<StoredConfiguration> {
        let mut entries = self.entries();
        let current = entries.live.get(key).map(|c| c.version);

        if let Some(expected) = expected_version {
            let matches = match current {
                Some(version) => version == expected,
                None => expected == 0,
            };
            if !matches {
                return Err(PersistenceError::Conflict {
                    expected,
                    actual: current,
                });
            }
        }

        let previous = current.or_else(|| entries.retired.get(key).copied());
        let stored = StoredConfiguration {
            store_id: key.store_id.clone(),
            page_type: key.page_type,
            variant: key.variant,
            version: previous.unwrap_or(0) + 1,
            updated_at: Utc::now(),
            updated_by: updated_by.map(str::to_string),
            configuration: document.clone(),
        };
        entries.retired.remove(key);
        entries.live.insert(key.clone(), stored.clone());
        log::debug!("memory backend: stored {} v{}", key, stored.version);
        Ok(stored)
    }

    pub fn promote_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        updated_by: Option<&str>,
    ) -> PersistenceResult<StoredConfiguration> {
        let draft = self
            .get(&ConfigKey::draft(store_id, page_type))
            .ok_or_else(|| PersistenceError::NothingToPublish {
                store_id: store_id.to_string(),
                page_type: page_type.to_string(),
            })?;
        self.put(
            &ConfigKey::published(store_id, page_type),
            &draft.configuration,
            None,
            updated_by,
        )
    }

    pub fn remove(&self, key: &ConfigKey) -> bool {
        let mut entries = self.entries();
        match entries.live.remove(key) {
            Some(removed) => {
                entries.retired.insert(key.clone(), removed.version);
                true
            }
            None => false,
        }
    }

    /// Every stored key for one store, sorted.
    pub fn keys_for_store(&self, store_id: &str) -> Vec<ConfigKey> {
        let mut keys: Vec<_> = self
            .entries()
            .live
            .keys()
            .filter(|k| k.store_id == store_id)
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ConfigurationBackend for MemoryBackend {
    fn fetch(
        &self,
        key: &ConfigKey,
    ) -> impl Future<Output = PersistenceResult<Option<StoredConfiguration>>> + Send {
        std::future::ready(Ok(self.get(key)))
    }

    fn save_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
        let key = ConfigKey::new(store_id, page_type, Variant::Draft);
        std::future::ready(self.put(&key, document, expected_version, None))
    }

    fn publish(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
        std::future::ready(self.promote_draft(store_id, page_type, None))
    }

    fn discard_draft(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<bool>> + Send {
        std::future::ready(Ok(self.remove(&ConfigKey::draft(store_id, page_type))))
    }
}
