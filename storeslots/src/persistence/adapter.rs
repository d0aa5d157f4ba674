use chrono::{DateTime, Utc};

use crate::error::{PersistenceError, PersistenceResult};
use crate::slots::SlotStore;
use crate::storage::DraftCache;

use super::{
    Baseline, ConfigKey, ConfigurationBackend, ConfigurationDocument, DocumentMetadata, PageType,
    StoredConfiguration, Variant,
};

/// A validated configuration as handed to the editor or the storefront.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfiguration {
    pub store: SlotStore,
    pub metadata: DocumentMetadata,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl TryFrom<StoredConfiguration> for LoadedConfiguration {
    type Error = PersistenceError;

    fn try_from(stored: StoredConfiguration) -> Result<Self, Self::Error> {
        let (store, metadata) = stored.configuration.into_store()?;
        Ok(Self {
            store,
            metadata,
            version: stored.version,
            updated_at: stored.updated_at,
            updated_by: stored.updated_by,
        })
    }
}

/// How `ensure_draft_exists` found or produced the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    Existing,
    CopiedFromPublished,
    Seeded,
}

/// Loads and saves page configurations through a backend, optionally keeping
/// drafts that failed to save in a local cache.
pub struct ConfigurationAdapter<B> {
    backend: B,
    cache: Option<DraftCache>,
}

impl<B: ConfigurationBackend> ConfigurationAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: DraftCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> Option<&DraftCache> {
        self.cache.as_ref()
    }

    /// `Ok(None)` when nothing is stored; `Err` when the load itself failed
    /// or the stored document is not a valid tree.
    pub async fn load_configuration(
        &self,
        store_id: &str,
        page_type: PageType,
        variant: Variant,
    ) -> PersistenceResult<Option<LoadedConfiguration>> {
        let key = ConfigKey::new(store_id, page_type, variant);
        match self.backend.fetch(&key).await? {
            Some(stored) => {
                log::debug!("loaded {} v{}", key, stored.version);
                Ok(Some(LoadedConfiguration::try_from(stored)?))
            }
            None => {
                log::debug!("no configuration stored for {}", key);
                Ok(None)
            }
        }
    }

    /// Overwrite the draft with `store`. With `expected_version` the save only
    /// succeeds if the stored draft is still at that version.
    ///
    /// A network failure stashes the document in the draft cache (when one is
    /// configured) and still returns the error.
    pub async fn save_configuration(
        &self,
        store_id: &str,
        page_type: PageType,
        store: &SlotStore,
        metadata: DocumentMetadata,
        expected_version: Option<i64>,
    ) -> PersistenceResult<StoredConfiguration> {
        let mut document = ConfigurationDocument::from_store(store, metadata);
        document.metadata.updated_at = Some(Utc::now());
        document.validate()?;

        match self
            .backend
            .save_draft(store_id, page_type, &document, expected_version)
            .await
        {
            Ok(stored) => {
                log::info!("saved draft {}/{} v{}", store_id, page_type, stored.version);
                if let Some(cache) = &self.cache {
                    cache.discard(store_id, page_type)?;
                }
                Ok(stored)
            }
            Err(err @ PersistenceError::Network(_)) => {
                log::warn!("saving draft {}/{} failed: {}", store_id, page_type, err);
                if let Some(cache) = &self.cache {
                    cache.stash(store_id, page_type, &document, expected_version)?;
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Make sure the page has a draft to edit: keep an existing one, else copy
    /// the published document, else seed from `seed`.
    pub async fn ensure_draft_exists(
        &self,
        store_id: &str,
        page_type: PageType,
        seed: &Baseline,
    ) -> PersistenceResult<DraftOrigin> {
        if self
            .backend
            .fetch(&ConfigKey::draft(store_id, page_type))
            .await?
            .is_some()
        {
            return Ok(DraftOrigin::Existing);
        }

        let (document, origin) = match self
            .backend
            .fetch(&ConfigKey::published(store_id, page_type))
            .await?
        {
            Some(published) => (published.configuration, DraftOrigin::CopiedFromPublished),
            None => (seed.resolve(page_type)?, DraftOrigin::Seeded),
        };

        // Create-only: if another editor got there first, theirs wins.
        match self
            .backend
            .save_draft(store_id, page_type, &document, Some(0))
            .await
        {
            Ok(_) => {
                log::info!("created draft {}/{} ({:?})", store_id, page_type, origin);
                Ok(origin)
            }
            Err(PersistenceError::Conflict { .. }) => Ok(DraftOrigin::Existing),
            Err(err) => Err(err),
        }
    }

    pub async fn publish(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> PersistenceResult<StoredConfiguration> {
        let published = self.backend.publish(store_id, page_type).await?;
        log::info!("published {}/{} v{}", store_id, page_type, published.version);
        Ok(published)
    }

    pub async fn discard_draft(&self, store_id: &str, page_type: PageType) -> PersistenceResult<bool> {
        self.backend.discard_draft(store_id, page_type).await
    }

    /// Re-send every stashed draft. Drafts that fail again stay stashed;
    /// returns how many were saved.
    pub async fn retry_pending(&self) -> PersistenceResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };
        let mut saved = 0;
        for pending in cache.pending()? {
            match self
                .backend
                .save_draft(
                    &pending.store_id,
                    pending.page_type,
                    &pending.document,
                    pending.base_version,
                )
                .await
            {
                Ok(_) => {
                    cache.discard(&pending.store_id, pending.page_type)?;
                    saved += 1;
                }
                Err(err) => {
                    log::warn!(
                        "retry of {}/{} failed: {}",
                        pending.store_id,
                        pending.page_type,
                        err
                    );
                }
            }
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::slots::SlotType;

    /// Memory backend that can be switched into a failing state.
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        offline: AtomicBool,
    }

    impl FlakyBackend {
        fn gate(&self) -> PersistenceResult<()> {
            if self.offline.load(Ordering::SeqCst) {
                Err(PersistenceError::Network("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    impl ConfigurationBackend for FlakyBackend {
        fn fetch(
            &self,
            key: &ConfigKey,
        ) -> impl Future<Output = PersistenceResult<Option<StoredConfiguration>>> + Send {
            let result = self.gate().map(|_| self.inner.get(key));
            std::future::ready(result)
        }

        fn save_draft(
            &self,
            store_id: &str,
            page_type: PageType,
            document: &ConfigurationDocument,
            expected_version: Option<i64>,
        ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
            let result = self.gate().and_then(|_| {
                self.inner.put(
                    &ConfigKey::draft(store_id, page_type),
                    document,
                    expected_version,
                    None,
                )
            });
            std::future::ready(result)
        }

        fn publish(
            &self,
            store_id: &str,
            page_type: PageType,
        ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
            let result = self
                .gate()
                .and_then(|_| self.inner.promote_draft(store_id, page_type, None));
            std::future::ready(result)
        }

        fn discard_draft(
            &self,
            store_id: &str,
            page_type: PageType,
        ) -> impl Future<Output = PersistenceResult<bool>> + Send {
            let result = self
                .gate()
                .map(|_| self.inner.remove(&ConfigKey::draft(store_id, page_type)));
            std::future::ready(result)
        }
    }

    fn small_store() -> SlotStore {
        let mut store = SlotStore::new();
        let c1 = store.create_slot(SlotType::Container, None).unwrap().id.clone();
        store.create_slot(SlotType::Text, Some(&c1)).unwrap();
        store
    }

    #[tokio::test]
    async fn missing_configuration_is_none_not_error() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let loaded = adapter
            .load_configuration("s1", PageType::Cart, Variant::Published)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn failed_load_is_an_error() {
        let backend = FlakyBackend::default();
        backend.offline.store(true, Ordering::SeqCst);
        let adapter = ConfigurationAdapter::new(backend);
        let result = adapter
            .load_configuration("s1", PageType::Cart, Variant::Draft)
            .await;
        assert!(matches!(result, Err(PersistenceError::Network(_))));
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_tree() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let store = small_store();

        let saved = adapter
            .save_configuration("s1", PageType::Cart, &store, DocumentMetadata::named("Cart"), None)
            .await
            .unwrap();
        assert_eq!(saved.version, 1);
        assert!(saved.configuration.metadata.updated_at.is_some());

        let loaded = adapter
            .load_configuration("s1", PageType::Cart, Variant::Draft)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.store, store);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.metadata.page_name.as_deref(), Some("Cart"));
    }

    #[tokio::test]
    async fn stale_save_conflicts() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let store = small_store();
        let meta = DocumentMetadata::default;

        adapter
            .save_configuration("s1", PageType::Cart, &store, meta(), None)
            .await
            .unwrap();
        adapter
            .save_configuration("s1", PageType::Cart, &store, meta(), Some(1))
            .await
            .unwrap();
        let err = adapter
            .save_configuration("s1", PageType::Cart, &store, meta(), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Conflict {
                expected: 1,
                actual: Some(2)
            }
        ));
    }

    #[tokio::test]
    async fn ensure_draft_prefers_published_then_baseline() {
        let backend = MemoryBackend::new();
        let adapter = ConfigurationAdapter::new(backend.clone());

        let origin = adapter
            .ensure_draft_exists("s1", PageType::Checkout, &Baseline::BuiltIn)
            .await
            .unwrap();
        assert_eq!(origin, DraftOrigin::Seeded);
        let again = adapter
            .ensure_draft_exists("s1", PageType::Checkout, &Baseline::BuiltIn)
            .await
            .unwrap();
        assert_eq!(again, DraftOrigin::Existing);

        let published_doc = small_store().to_document(DocumentMetadata::named("Live cart"));
        backend
            .put(&ConfigKey::published("s1", PageType::Cart), &published_doc, None, None)
            .unwrap();
        let origin = adapter
            .ensure_draft_exists("s1", PageType::Cart, &Baseline::BuiltIn)
            .await
            .unwrap();
        assert_eq!(origin, DraftOrigin::CopiedFromPublished);
        let draft = backend.get(&ConfigKey::draft("s1", PageType::Cart)).unwrap();
        assert_eq!(draft.configuration, published_doc);
    }

    #[tokio::test]
    async fn publish_makes_draft_live() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        assert!(matches!(
            adapter.publish("s1", PageType::Home).await,
            Err(PersistenceError::NothingToPublish { .. })
        ));

        let store = small_store();
        adapter
            .save_configuration("s1", PageType::Home, &store, DocumentMetadata::default(), None)
            .await
            .unwrap();
        adapter.publish("s1", PageType::Home).await.unwrap();

        let live = adapter
            .load_configuration("s1", PageType::Home, Variant::Published)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.store, store);
        assert!(adapter.discard_draft("s1", PageType::Home).await.unwrap());
    }

    #[tokio::test]
    async fn network_failure_stashes_and_retry_flushes() {
        let adapter = ConfigurationAdapter::new(FlakyBackend::default())
            .with_cache(DraftCache::in_memory().unwrap());
        let store = small_store();

        adapter.backend().offline.store(true, Ordering::SeqCst);
        let err = adapter
            .save_configuration("s1", PageType::Cart, &store, DocumentMetadata::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Network(_)));
        let cache = adapter.cache().unwrap();
        assert_eq!(cache.pending().unwrap().len(), 1);

        assert_eq!(adapter.retry_pending().await.unwrap(), 0);
        assert_eq!(cache.pending().unwrap().len(), 1);

        adapter.backend().offline.store(false, Ordering::SeqCst);
        assert_eq!(adapter.retry_pending().await.unwrap(), 1);
        assert!(cache.pending().unwrap().is_empty());
        let loaded = adapter
            .load_configuration("s1", PageType::Cart, Variant::Draft)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.store, store);
    }

    #[tokio::test]
    async fn invalid_tree_is_never_sent() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut store = small_store();
        let root = store.root_slots()[0].clone();
        store.root_slots.push(root);

        let err = adapter
            .save_configuration("s1", PageType::Cart, &store, DocumentMetadata::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Document(_)));
        assert!(adapter.backend().get(&ConfigKey::draft("s1", PageType::Cart)).is_none());
    }
}
