//! Drag-and-drop: turns one completed drag gesture into exactly one tree
//! mutation.
//!
//! Containers take a drop as "nest inside" only when the pointer is over
//! their content region; every other drop repositions the dragged slot
//! among the target's siblings.

use crate::error::{SlotError, SlotResult};
use crate::slots::{SlotId, SlotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRegion {
    Before,
    After,
    Content,
}

impl DropRegion {
    /// Region under the pointer, `offset_y` measured from the top of a target
    /// `height` pixels tall. Containers reserve their middle half for nesting;
    /// leaves split at the midpoint.
    pub fn from_pointer(offset_y: f64, height: f64, is_container: bool) -> Self {
        if height <= 0.0 {
            return DropRegion::After;
        }
        let ratio = (offset_y / height).clamp(0.0, 1.0);
        if is_container {
            if ratio < 0.25 {
                DropRegion::Before
            } else if ratio > 0.75 {
                DropRegion::After
            } else {
                DropRegion::Content
            }
        } else if ratio < 0.5 {
            DropRegion::Before
        } else {
            DropRegion::After
        }
    }
}

/// Where the pointer was released: a slot (with region) or the bare canvas
/// (`slot == None`, meaning the end of the root list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub slot: Option<SlotId>,
    pub region: DropRegion,
}

impl DropTarget {
    pub fn on(slot: &SlotId, region: DropRegion) -> Self {
        Self {
            slot: Some(slot.clone()),
            region,
        }
    }

    pub fn canvas() -> Self {
        Self {
            slot: None,
            region: DropRegion::After,
        }
    }
}

/// The single mutator call a drop resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    /// Append into a container.
    Nest { slot: SlotId, container: SlotId },
    /// Reposition among the current siblings.
    Reorder {
        owner: Option<SlotId>,
        order: Vec<SlotId>,
    },
    /// Move next to a sibling under a different owner.
    Relocate {
        slot: SlotId,
        parent: Option<SlotId>,
        index: usize,
    },
}

impl DropAction {
    pub fn apply(&self, store: &mut SlotStore) -> SlotResult<()> {
        match self {
            DropAction::Nest { slot, container } => store.move_slot(slot, Some(container), None),
            DropAction::Reorder { owner, order } => store.reorder(owner.as_ref(), order),
            DropAction::Relocate {
                slot,
                parent,
                index,
            } => store.move_slot(slot, parent.as_ref(), Some(*index)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Applied(DropAction),
    /// Nothing to do: no drag, no target, or a drop that changes nothing.
    Cancelled,
    /// The mutator refused; the tree is unchanged.
    Rejected { action: DropAction, error: SlotError },
}

/// Decide what dropping `dragged` on `target` means, without mutating.
pub fn resolve_drop(store: &SlotStore, dragged: &SlotId, target: &DropTarget) -> Option<DropAction> {
    if !store.contains(dragged) {
        return None;
    }

    let Some(target_id) = &target.slot else {
        let roots = store.root_slots();
        return place_among(store, dragged, None, roots.len());
    };
    if target_id == dragged {
        return None;
    }
    let target_slot = store.get(target_id)?;

    if target.region == DropRegion::Content && target_slot.slot_type.can_have_children() {
        // Nesting appends, so the current last child of this container stays put.
        if store.parent_of(dragged) == Some(target_id)
            && store.children_of(target_id).last() == Some(dragged)
        {
            return None;
        }
        return Some(DropAction::Nest {
            slot: dragged.clone(),
            container: target_id.clone(),
        });
    }

    let owner = target_slot.parent_id.clone();
    let siblings: Vec<&SlotId> = store
        .owner_list(owner.as_ref())?
        .iter()
        .filter(|id| *id != dragged)
        .collect();
    let position = siblings.iter().position(|id| *id == target_id)?;
    let index = match target.region {
        DropRegion::Before => position,
        // A content drop on a leaf lands after it.
        DropRegion::After | DropRegion::Content => position + 1,
    };
    place_among(store, dragged, owner.as_ref(), index)
}

/// `index` counts positions in the owner's list with `dragged` removed.
fn place_among(
    store: &SlotStore,
    dragged: &SlotId,
    owner: Option<&SlotId>,
    index: usize,
) -> Option<DropAction> {
    let current = store.owner_list(owner)?;
    if store.parent_of(dragged) == owner {
        let mut order: Vec<SlotId> = current.iter().filter(|id| *id != dragged).cloned().collect();
        let at = index.min(order.len());
        order.insert(at, dragged.clone());
        if order == current {
            return None;
        }
        Some(DropAction::Reorder {
            owner: owner.cloned(),
            order,
        })
    } else {
        Some(DropAction::Relocate {
            slot: dragged.clone(),
            parent: owner.cloned(),
            index: index.min(current.len()),
        })
    }
}

/// Tracks one drag gesture from pick-up to release.
#[derive(Debug, Default)]
pub struct DragController {
    dragging: Option<SlotId>,
    hover: Option<DropTarget>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, slot: &SlotId) {
        self.dragging = Some(slot.clone());
        self.hover = None;
    }

    pub fn dragging(&self) -> Option<&SlotId> {
        self.dragging.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn hover(&mut self, target: Option<DropTarget>) {
        if self.dragging.is_some() {
            self.hover = target;
        }
    }

    pub fn hover_target(&self) -> Option<&DropTarget> {
        self.hover.as_ref()
    }

    /// What releasing at the current hover target would do.
    pub fn preview(&self, store: &SlotStore) -> Option<DropAction> {
        let dragged = self.dragging.as_ref()?;
        resolve_drop(store, dragged, self.hover.as_ref()?)
    }

    pub fn cancel(&mut self) {
        self.dragging = None;
        self.hover = None;
    }

    /// Finish the drag at `target`, falling back to the last hover target.
    /// Applies at most one mutation.
    pub fn drop(&mut self, store: &mut SlotStore, target: Option<DropTarget>) -> DropOutcome {
        let dragged = self.dragging.take();
        let hovered = self.hover.take();
        let (Some(dragged), Some(target)) = (dragged, target.or(hovered)) else {
            return DropOutcome::Cancelled;
        };

        let Some(action) = resolve_drop(store, &dragged, &target) else {
            return DropOutcome::Cancelled;
        };
        match action.apply(store) {
            Ok(()) => {
                log::debug!("drop applied: {:?}", action);
                DropOutcome::Applied(action)
            }
            Err(error) => {
                log::debug!("drop rejected: {}", error);
                DropOutcome::Rejected { action, error }
            }
        }
    }
}
