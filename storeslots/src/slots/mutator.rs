//! Tree mutations on [`SlotStore`].
//!
//! Every operation validates first and mutates second, so an `Err` always
//! means the store is exactly as it was before the call.

use std::collections::HashMap;

use crate::error::{SlotError, SlotResult};

use super::{Slot, SlotId, SlotStore, SlotType};

impl SlotStore {
    /// Allocate a slot of `slot_type` with its type defaults, appended to
    /// `parent`'s children or to the end of the root list.
    pub fn create_slot(&mut self, slot_type: SlotType, parent: Option<&SlotId>) -> SlotResult<&Slot> {
        if let Some(parent_id) = parent {
            self.check_placement(parent_id, &slot_type)?;
        }

        let id = self.fresh_id(&slot_type, &HashMap::new());
        let mut slot = Slot::new(id.clone(), slot_type);
        slot.parent_id = parent.cloned();

        if let Some(list) = self.owner_list_mut(parent) {
            list.push(id.clone());
        }
        log::debug!("created slot {} ({}) under {:?}", id, slot.slot_type, parent);
        self.slots.insert(id.clone(), slot);
        Ok(&self.slots[&id])
    }

    /// Remove `id` and its whole subtree. Unknown ids are a no-op.
    /// Returns the removed ids, `id` first.
    pub fn delete_slot(&mut self, id: &SlotId) -> Vec<SlotId> {
        let removed = self.subtree(id);
        if removed.is_empty() {
            return removed;
        }
        self.detach(id);
        for gone in &removed {
            self.slots.remove(gone);
        }
        log::debug!("deleted slot {} and {} descendants", id, removed.len() - 1);
        removed
    }

    /// Reattach `id` under `new_parent` (or at root) at `index`, clamped to
    /// the end of the destination list. The index counts positions after
    /// `id` has been detached from its current owner.
    pub fn move_slot(
        &mut self,
        id: &SlotId,
        new_parent: Option<&SlotId>,
        index: Option<usize>,
    ) -> SlotResult<()> {
        let slot_type = self
            .slots
            .get(id)
            .map(|s| s.slot_type.clone())
            .ok_or_else(|| SlotError::NotFound(id.clone()))?;

        if let Some(target) = new_parent {
            if target == id || self.is_ancestor(id, target) {
                return Err(SlotError::CycleDetected {
                    slot: id.clone(),
                    target: target.clone(),
                });
            }
            self.check_placement(target, &slot_type)?;
        }

        self.detach(id);
        if let Some(list) = self.owner_list_mut(new_parent) {
            let at = index.unwrap_or(list.len()).min(list.len());
            list.insert(at, id.clone());
        }
        if let Some(slot) = self.slots.get_mut(id) {
            slot.parent_id = new_parent.cloned();
        }
        log::debug!("moved slot {} under {:?} at {:?}", id, new_parent, index);
        Ok(())
    }

    /// Replace the child order of `owner` (root list for `None`) wholesale.
    pub fn reorder(&mut self, owner: Option<&SlotId>, ordered: &[SlotId]) -> SlotResult<()> {
        let current = self
            .owner_list(owner)
            .ok_or_else(|| SlotError::NotFound(owner.cloned().unwrap_or_else(|| "root".into())))?;

        let mut expected: Vec<&SlotId> = current.iter().collect();
        let mut proposed: Vec<&SlotId> = ordered.iter().collect();
        expected.sort();
        proposed.sort();
        if expected != proposed {
            return Err(SlotError::NotAPermutation {
                owner: owner.map(|o| o.to_string()).unwrap_or_else(|| "root".to_string()),
            });
        }

        if let Some(list) = self.owner_list_mut(owner) {
            *list = ordered.to_vec();
        }
        Ok(())
    }

    // ── Content & style edits ───────────────────────────────────────────

    pub fn update_content(&mut self, id: &SlotId, content: impl Into<String>) -> SlotResult<()> {
        self.slot_mut(id)?.content = content.into();
        Ok(())
    }

    pub fn set_class_name(&mut self, id: &SlotId, class_name: Option<String>) -> SlotResult<()> {
        self.slot_mut(id)?.styles.class_name = class_name.filter(|c| !c.trim().is_empty());
        Ok(())
    }

    pub fn set_inline_style(&mut self, id: &SlotId, key: &str, value: &str) -> SlotResult<()> {
        self.slot_mut(id)?
            .styles
            .inline
            .insert(key.trim().to_string(), value.trim().to_string());
        Ok(())
    }

    /// Drop one inline style override, returning its previous value.
    pub fn remove_inline_style(&mut self, id: &SlotId, key: &str) -> SlotResult<Option<String>> {
        Ok(self.slot_mut(id)?.styles.inline.remove(key))
    }

    pub fn rename_slot(&mut self, id: &SlotId, name: &str) -> SlotResult<()> {
        self.slot_mut(id)?.metadata.name = Some(name.to_string());
        Ok(())
    }

    /// Deep-copy the subtree rooted at `id` with fresh ids and insert the
    /// copy right after the original. Returns the id of the copy.
    pub fn duplicate_slot(&mut self, id: &SlotId) -> SlotResult<SlotId> {
        let originals = self.subtree(id);
        if originals.is_empty() {
            return Err(SlotError::NotFound(id.clone()));
        }

        let mut renamed: HashMap<SlotId, SlotId> = HashMap::new();
        for old in &originals {
            let slot_type = &self.slots[old].slot_type;
            let fresh = self.fresh_id(slot_type, &renamed);
            renamed.insert(old.clone(), fresh);
        }

        let owner = self.parent_of(id).cloned();
        let copies: Vec<Slot> = originals
            .iter()
            .map(|old| {
                let source = &self.slots[old];
                let mut copy = source.clone();
                copy.id = renamed[old].clone();
                copy.parent_id = if old == id {
                    owner.clone()
                } else {
                    source.parent_id.as_ref().map(|p| renamed[p].clone())
                };
                copy.children = source.children.iter().map(|c| renamed[c].clone()).collect();
                copy
            })
            .collect();

        let copy_id = renamed[id].clone();
        let position = self.index_in_owner(id).map(|i| i + 1);
        for copy in copies {
            self.slots.insert(copy.id.clone(), copy);
        }
        if let Some(list) = self.owner_list_mut(owner.as_ref()) {
            let at = position.unwrap_or(list.len()).min(list.len());
            list.insert(at, copy_id.clone());
        }
        Ok(copy_id)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Containment rule for placing a `child_type` slot directly under `parent`.
    pub fn check_placement(&self, parent: &SlotId, child_type: &SlotType) -> SlotResult<()> {
        let parent_slot = self
            .slots
            .get(parent)
            .ok_or_else(|| SlotError::NotFound(parent.clone()))?;
        if !parent_slot.slot_type.can_have_children() {
            return Err(SlotError::NotAContainer {
                parent: parent.clone(),
                parent_type: parent_slot.slot_type.clone(),
            });
        }
        if !parent_slot.slot_type.accepts_child(child_type) {
            return Err(SlotError::ChildTypeRejected {
                parent_type: parent_slot.slot_type.clone(),
                child_type: child_type.clone(),
            });
        }
        Ok(())
    }

    fn slot_mut(&mut self, id: &SlotId) -> SlotResult<&mut Slot> {
        self.slots
            .get_mut(id)
            .ok_or_else(|| SlotError::NotFound(id.clone()))
    }

    /// Remove `id` from whichever list currently owns it.
    fn detach(&mut self, id: &SlotId) {
        let owner = self.parent_of(id).cloned();
        if let Some(list) = self.owner_list_mut(owner.as_ref()) {
            list.retain(|c| c != id);
        }
    }

    fn fresh_id(&self, slot_type: &SlotType, pending: &HashMap<SlotId, SlotId>) -> SlotId {
        loop {
            let id = SlotId::generate(slot_type);
            if !self.slots.contains_key(&id) && !pending.values().any(|p| p == &id) {
                return id;
            }
        }
    }
}
