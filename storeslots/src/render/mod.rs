//! Pure rendering of a slot tree into renderable nodes.
//!
//! The same function feeds the editor canvas and the live storefront; only
//! [`RenderMode::Edit`] attaches editing affordances, the content mapping
//! never depends on the mode.

pub mod html;

use std::collections::{BTreeMap, HashSet};

use crate::slots::{Slot, SlotId, SlotStore, SlotType};

pub use html::to_html;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderMode {
    Edit {
        selected: Option<SlotId>,
    },
    Preview,
    #[default]
    Live,
}

impl RenderMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, RenderMode::Edit { .. })
    }
}

/// What a slot turns into, decided purely by its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Text { text: String },
    Button { label: String },
    Image { src: String, alt: String },
    Container { grid: bool },
    /// Raw markup injection, used for `html` and for unrecognized types.
    Raw { markup: String },
}

/// Editor-only decorations. Never present outside edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    pub label: String,
    pub selected: bool,
    pub draggable: bool,
    pub drop_zone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    pub slot_id: SlotId,
    pub slot_type: SlotType,
    pub element: Element,
    pub class_name: Option<String>,
    pub style: BTreeMap<String, String>,
    pub children: Vec<RenderNode>,
    pub affordances: Option<Affordances>,
}

impl RenderNode {
    /// Copy of this subtree with every editing affordance stripped.
    pub fn without_affordances(&self) -> RenderNode {
        RenderNode {
            affordances: None,
            children: self.children.iter().map(|c| c.without_affordances()).collect(),
            ..self.clone()
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }
}

/// Render `roots` (normally `store.root_slots()`) in order.
///
/// Ids that do not resolve are skipped with a warning; one bad entry never
/// blanks the rest of the page.
pub fn render(store: &SlotStore, roots: &[SlotId], mode: &RenderMode) -> Vec<RenderNode> {
    let mut visiting = HashSet::new();
    roots
        .iter()
        .filter_map(|id| render_slot(store, id, mode, &mut visiting))
        .collect()
}

/// Render the whole page in root order.
pub fn render_page(store: &SlotStore, mode: &RenderMode) -> Vec<RenderNode> {
    render(store, store.root_slots(), mode)
}

fn render_slot(
    store: &SlotStore,
    id: &SlotId,
    mode: &RenderMode,
    visiting: &mut HashSet<SlotId>,
) -> Option<RenderNode> {
    let Some(slot) = store.get(id) else {
        log::warn!("render: skipping missing slot {}", id);
        return None;
    };
    if !visiting.insert(id.clone()) {
        log::warn!("render: slot {} reached twice, skipping", id);
        return None;
    }

    let children = if slot.slot_type.can_have_children() {
        slot.children
            .iter()
            .filter_map(|child| render_slot(store, child, mode, visiting))
            .collect()
    } else {
        Vec::new()
    };
    visiting.remove(id);

    Some(RenderNode {
        slot_id: slot.id.clone(),
        slot_type: slot.slot_type.clone(),
        element: element_for(slot),
        class_name: slot.styles.class_name.clone(),
        style: slot.styles.inline.clone(),
        children,
        affordances: affordances_for(slot, mode),
    })
}

fn element_for(slot: &Slot) -> Element {
    match &slot.slot_type {
        SlotType::Text => Element::Text {
            text: slot.content.clone(),
        },
        SlotType::Button => Element::Button {
            label: slot.content.clone(),
        },
        SlotType::Image => Element::Image {
            src: slot.content.clone(),
            alt: slot.metadata.name.clone().unwrap_or_default(),
        },
        SlotType::Container => Element::Container { grid: false },
        SlotType::Grid => Element::Container { grid: true },
        SlotType::Html | SlotType::Unrecognized(_) => Element::Raw {
            markup: slot.content.clone(),
        },
    }
}

fn affordances_for(slot: &Slot, mode: &RenderMode) -> Option<Affordances> {
    match mode {
        RenderMode::Edit { selected } => Some(Affordances {
            label: slot.display_name().to_string(),
            selected: selected.as_ref() == Some(&slot.id),
            draggable: true,
            drop_zone: slot.slot_type.can_have_children(),
        }),
        RenderMode::Preview | RenderMode::Live => None,
    }
}
