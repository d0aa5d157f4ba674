use std::collections::{BTreeMap, HashSet};

use crate::error::DocumentError;

use super::{Slot, SlotId};

/// The editable page document: every slot by id plus the ordered list of
/// root slots. Mutations live in [`super::mutator`]; this module holds the
/// read side and the full invariant check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotStore {
    pub(crate) slots: BTreeMap<SlotId, Slot>,
    pub(crate) root_slots: Vec<SlotId>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from raw parts, checking every invariant.
    pub fn from_parts(
        slots: BTreeMap<SlotId, Slot>,
        root_slots: Vec<SlotId>,
    ) -> Result<Self, DocumentError> {
        let store = Self { slots, root_slots };
        store.validate()?;
        Ok(store)
    }

    pub fn into_parts(self) -> (BTreeMap<SlotId, Slot>, Vec<SlotId>) {
        (self.slots, self.root_slots)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &SlotId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.get(id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn root_slots(&self) -> &[SlotId] {
        &self.root_slots
    }

    /// Children of `id` in render order; empty for leaves and unknown ids.
    pub fn children_of(&self, id: &SlotId) -> &[SlotId] {
        self.slots
            .get(id)
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, id: &SlotId) -> Option<&SlotId> {
        self.slots.get(id).and_then(|s| s.parent_id.as_ref())
    }

    /// The ordered list that owns children of `owner`: the root list for
    /// `None`, the container's children otherwise.
    pub fn owner_list(&self, owner: Option<&SlotId>) -> Option<&[SlotId]> {
        match owner {
            None => Some(&self.root_slots),
            Some(id) => self.slots.get(id).map(|s| s.children.as_slice()),
        }
    }

    pub(crate) fn owner_list_mut(&mut self, owner: Option<&SlotId>) -> Option<&mut Vec<SlotId>> {
        match owner {
            None => Some(&mut self.root_slots),
            Some(id) => self.slots.get_mut(id).map(|s| &mut s.children),
        }
    }

    /// Position of `id` within its owner's list.
    pub fn index_in_owner(&self, id: &SlotId) -> Option<usize> {
        let owner = self.slots.get(id)?.parent_id.as_ref();
        self.owner_list(owner)?.iter().position(|c| c == id)
    }

    /// True when `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: &SlotId, id: &SlotId) -> bool {
        let mut current = self.parent_of(id);
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.slots.len() {
                return false;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: &SlotId) -> Vec<SlotId> {
        let mut out = self.subtree(id);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// `id` followed by all of its descendants in pre-order.
    pub fn subtree(&self, id: &SlotId) -> Vec<SlotId> {
        let mut out = Vec::new();
        if !self.slots.contains_key(id) {
            return out;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            stack.extend(self.children_of(&next).iter().rev().cloned());
            out.push(next);
        }
        out
    }

    /// Check every tree invariant, returning the first violation found.
    pub fn validate(&self) -> Result<(), DocumentError> {
        for (key, slot) in &self.slots {
            if key != &slot.id {
                return Err(DocumentError::KeyMismatch {
                    key: key.clone(),
                    id: slot.id.clone(),
                });
            }
        }

        for root in &self.root_slots {
            let slot = self
                .slots
                .get(root)
                .ok_or_else(|| DocumentError::MissingRoot(root.clone()))?;
            if slot.parent_id.is_some() {
                return Err(DocumentError::ParentMismatch { slot: root.clone() });
            }
        }

        for slot in self.slots.values() {
            if !slot.children.is_empty() {
                self.check_placement_of_children(slot)?;
            }
            match &slot.parent_id {
                Some(parent_id) => {
                    let parent = self.slots.get(parent_id).ok_or_else(|| {
                        DocumentError::DanglingReference {
                            slot: slot.id.clone(),
                            missing: parent_id.clone(),
                        }
                    })?;
                    if !parent.children.contains(&slot.id) {
                        return Err(DocumentError::ParentMismatch {
                            slot: slot.id.clone(),
                        });
                    }
                }
                None => {
                    if !self.root_slots.contains(&slot.id) {
                        return Err(DocumentError::Unreachable {
                            slot: slot.id.clone(),
                        });
                    }
                }
            }
        }

        // Every slot must be reached exactly once walking down from the roots.
        let mut visited = HashSet::new();
        let mut stack: Vec<&SlotId> = self.root_slots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(DocumentError::DuplicateEntry { slot: id.clone() });
            }
            stack.extend(self.children_of(id).iter().rev());
        }
        if let Some(orphan) = self.slots.keys().find(|id| !visited.contains(id)) {
            return Err(DocumentError::Cycle {
                slot: orphan.clone(),
            });
        }

        Ok(())
    }

    fn check_placement_of_children(&self, slot: &Slot) -> Result<(), DocumentError> {
        for child_id in &slot.children {
            let child = self.slots.get(child_id).ok_or_else(|| {
                DocumentError::DanglingReference {
                    slot: slot.id.clone(),
                    missing: child_id.clone(),
                }
            })?;
            if child.parent_id.as_ref() != Some(&slot.id) {
                return Err(DocumentError::ParentMismatch {
                    slot: child_id.clone(),
                });
            }
            self.check_placement(&slot.id, &child.slot_type)?;
        }
        Ok(())
    }
}
