//! One editor's working copy of a page draft.

use crate::dnd::{DragController, DropOutcome, DropTarget};
use crate::error::{PersistenceError, PersistenceResult};
use crate::persistence::{
    Baseline, ConfigurationAdapter, ConfigurationBackend, DocumentMetadata, LoadedConfiguration,
    PageType, Variant,
};
use crate::render::{self, RenderMode, RenderNode};
use crate::slots::{SlotId, SlotStore};

pub struct EditorSession {
    store_id: String,
    page_type: PageType,
    store: SlotStore,
    metadata: DocumentMetadata,
    base_version: i64,
    saved_fingerprint: String,
    selected: Option<SlotId>,
    drag: DragController,
}

impl EditorSession {
    /// Ensure the page has a draft and load it for editing.
    pub async fn open<B: ConfigurationBackend>(
        adapter: &ConfigurationAdapter<B>,
        store_id: &str,
        page_type: PageType,
        seed: &Baseline,
    ) -> PersistenceResult<Self> {
        let origin = adapter.ensure_draft_exists(store_id, page_type, seed).await?;
        let loaded = load_draft(adapter, store_id, page_type).await?;
        log::info!(
            "editing {}/{} v{} ({:?})",
            store_id,
            page_type,
            loaded.version,
            origin
        );

        let saved_fingerprint = fingerprint(&loaded.store);
        Ok(Self {
            store_id: store_id.to_string(),
            page_type,
            store: loaded.store,
            metadata: loaded.metadata,
            base_version: loaded.version,
            saved_fingerprint,
            selected: None,
            drag: DragController::new(),
        })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Mutate the tree through the [`SlotStore`] mutator API.
    pub fn store_mut(&mut self) -> &mut SlotStore {
        &mut self.store
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Draft version this session was loaded from or last saved as.
    pub fn base_version(&self) -> i64 {
        self.base_version
    }

    pub fn is_dirty(&self) -> bool {
        fingerprint(&self.store) != self.saved_fingerprint
    }

    /// Select a slot; unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&SlotId>) {
        self.selected = id.filter(|id| self.store.contains(id)).cloned();
    }

    /// Current selection, if it still exists in the tree.
    pub fn selected(&self) -> Option<&SlotId> {
        self.selected.as_ref().filter(|id| self.store.contains(id))
    }

    pub fn drag(&mut self) -> &mut DragController {
        &mut self.drag
    }

    /// Finish the current drag against this session's tree.
    pub fn drop(&mut self, target: Option<DropTarget>) -> DropOutcome {
        self.drag.drop(&mut self.store, target)
    }

    pub fn render(&self, preview: bool) -> Vec<RenderNode> {
        let mode = if preview {
            RenderMode::Preview
        } else {
            RenderMode::Edit {
                selected: self.selected().cloned(),
            }
        };
        render::render_page(&self.store, &mode)
    }

    pub fn render_html(&self, preview: bool) -> String {
        render::to_html(&self.render(preview))
    }

    /// Save the tree as the page draft, provided nobody else saved since this
    /// session's base version. Returns the new version.
    pub async fn save<B: ConfigurationBackend>(
        &mut self,
        adapter: &ConfigurationAdapter<B>,
    ) -> PersistenceResult<i64> {
        let stored = adapter
            .save_configuration(
                &self.store_id,
                self.page_type,
                &self.store,
                self.metadata.clone(),
                Some(self.base_version),
            )
            .await?;
        self.base_version = stored.version;
        self.metadata = stored.configuration.metadata;
        self.saved_fingerprint = fingerprint(&self.store);
        Ok(stored.version)
    }

    /// Replace the working copy with the stored draft, dropping local edits.
    pub async fn reload<B: ConfigurationBackend>(
        &mut self,
        adapter: &ConfigurationAdapter<B>,
    ) -> PersistenceResult<()> {
        let loaded = load_draft(adapter, &self.store_id, self.page_type).await?;
        self.saved_fingerprint = fingerprint(&loaded.store);
        self.store = loaded.store;
        self.metadata = loaded.metadata;
        self.base_version = loaded.version;
        self.drag.cancel();
        if let Some(id) = &self.selected {
            if !self.store.contains(id) {
                self.selected = None;
            }
        }
        Ok(())
    }
}

async fn load_draft<B: ConfigurationBackend>(
    adapter: &ConfigurationAdapter<B>,
    store_id: &str,
    page_type: PageType,
) -> PersistenceResult<LoadedConfiguration> {
    adapter
        .load_configuration(store_id, page_type, Variant::Draft)
        .await?
        .ok_or_else(|| PersistenceError::Server {
            status: 404,
            message: format!("draft {}/{} disappeared", store_id, page_type),
        })
}

fn fingerprint(store: &SlotStore) -> String {
    store.to_document(DocumentMetadata::default()).fingerprint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnd::DropRegion;
    use crate::persistence::MemoryBackend;
    use crate::slots::SlotType;

    async fn session(adapter: &ConfigurationAdapter<MemoryBackend>) -> EditorSession {
        EditorSession::open(adapter, "s1", PageType::Cart, &Baseline::BuiltIn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn opens_seeded_draft_clean() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let editor = session(&adapter).await;
        assert_eq!(editor.base_version(), 1);
        assert!(!editor.is_dirty());
        assert_eq!(editor.store().root_slots().len(), 2);
        assert_eq!(editor.metadata().page_name.as_deref(), Some("Cart"));
    }

    #[tokio::test]
    async fn edits_mark_dirty_until_saved() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut editor = session(&adapter).await;

        let id = editor
            .store_mut()
            .create_slot(SlotType::Text, None)
            .unwrap()
            .id
            .clone();
        assert!(editor.is_dirty());

        let version = editor.save(&adapter).await.unwrap();
        assert_eq!(version, 2);
        assert!(!editor.is_dirty());

        editor.store_mut().delete_slot(&id);
        assert!(editor.is_dirty());
        editor.reload(&adapter).await.unwrap();
        assert!(!editor.is_dirty());
        assert!(editor.store().contains(&id));
    }

    #[tokio::test]
    async fn concurrent_save_is_detected() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut alice = session(&adapter).await;
        let mut bob = session(&adapter).await;

        alice.store_mut().create_slot(SlotType::Button, None).unwrap();
        alice.save(&adapter).await.unwrap();

        bob.store_mut().create_slot(SlotType::Image, None).unwrap();
        let err = bob.save(&adapter).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Conflict {
                expected: 1,
                actual: Some(2)
            }
        ));
        assert!(bob.is_dirty());

        bob.reload(&adapter).await.unwrap();
        assert_eq!(bob.store(), alice.store());
        assert_eq!(bob.base_version(), 2);
    }

    #[tokio::test]
    async fn stale_session_conflicts_after_draft_is_recreated() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut alice = session(&adapter).await;
        assert_eq!(alice.base_version(), 1);

        assert!(adapter.discard_draft("s1", PageType::Cart).await.unwrap());
        let carol = session(&adapter).await;
        assert_eq!(carol.base_version(), 2);

        alice.store_mut().create_slot(SlotType::Text, None).unwrap();
        let err = alice.save(&adapter).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Conflict {
                expected: 1,
                actual: Some(2)
            }
        ));
    }

    #[tokio::test]
    async fn edit_render_carries_selection_and_preview_does_not() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut editor = session(&adapter).await;
        let header = editor.store().root_slots()[0].clone();

        editor.select(Some(&header));
        let html = editor.render_html(false);
        assert!(html.contains("slot-selected"));
        assert!(html.contains(&format!("data-slot-id=\"{}\"", header)));

        let preview = editor.render_html(true);
        assert!(!preview.contains("slot-editable"));

        editor.select(Some(&"ghost".into()));
        assert!(editor.selected().is_none());

        editor.select(Some(&header));
        editor.store_mut().delete_slot(&header);
        assert!(editor.selected().is_none());
    }

    #[tokio::test]
    async fn drops_apply_to_the_working_copy() {
        let adapter = ConfigurationAdapter::new(MemoryBackend::new());
        let mut editor = session(&adapter).await;
        let roots = editor.store().root_slots().to_vec();

        editor.drag().begin(&roots[1]);
        let outcome = editor.drop(Some(DropTarget::on(&roots[0], DropRegion::Before)));
        assert!(matches!(outcome, DropOutcome::Applied(_)));
        assert_eq!(editor.store().root_slots(), &[roots[1].clone(), roots[0].clone()]);
        assert!(editor.is_dirty());
    }
}
