//! Slot configuration engine for storefront pages.
//!
//! A page is a forest of typed slots ([`slots::SlotStore`]) edited through
//! the mutator API or drag-and-drop ([`dnd`]), rendered for the editor, a
//! preview or the live storefront ([`render`]), and persisted as
//! draft/published configuration documents ([`persistence`]).

pub mod config;
pub mod dnd;
pub mod editor;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod render;
pub mod slots;
pub mod storage;

pub use editor::EditorSession;
pub use error::{DocumentError, PersistenceError, SlotError};
pub use persistence::{ConfigurationAdapter, PageType};
pub use slots::{Slot, SlotId, SlotStore, SlotType};
