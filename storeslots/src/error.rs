//! Error types for the slot engine and its persistence layer.

use thiserror::Error;

use crate::slots::{SlotId, SlotType};

/// Rejections raised by the tree mutator. A rejected call leaves the
/// store untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot not found: {0}")]
    NotFound(SlotId),

    #[error("Slot {parent} ({parent_type}) cannot hold children")]
    NotAContainer { parent: SlotId, parent_type: SlotType },

    #[error("A {parent_type} slot does not accept {child_type} children")]
    ChildTypeRejected {
        parent_type: SlotType,
        child_type: SlotType,
    },

    #[error("Moving {slot} under {target} would create a cycle")]
    CycleDetected { slot: SlotId, target: SlotId },

    #[error("Order for {owner} is not a permutation of its current children")]
    NotAPermutation { owner: String },
}

/// Structural problems found when turning a configuration document into a
/// slot store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Unsupported schema version {found} (supported up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("Slot entry keyed {key} carries id {id}")]
    KeyMismatch { key: SlotId, id: SlotId },

    #[error("Root list references missing slot {0}")]
    MissingRoot(SlotId),

    #[error("Slot {slot} references missing slot {missing}")]
    DanglingReference { slot: SlotId, missing: SlotId },

    #[error("Slot {slot} is listed more than once")]
    DuplicateEntry { slot: SlotId },

    #[error("Slot {slot} disagrees with its owner about parentage")]
    ParentMismatch { slot: SlotId },

    #[error("Slot {slot} is not reachable from any root")]
    Unreachable { slot: SlotId },

    #[error("Slot {slot} is its own ancestor")]
    Cycle { slot: SlotId },

    #[error(transparent)]
    Containment(#[from] SlotError),
}

/// Failures talking to a configuration backend or the local draft cache.
///
/// "Not found" is never an error here: loads return `Ok(None)` for it so a
/// missing configuration can't be mistaken for a failed request.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Version conflict: expected {expected}, stored {actual:?}")]
    Conflict { expected: i64, actual: Option<i64> },

    #[error("No draft to publish for {store_id}/{page_type}")]
    NothingToPublish { store_id: String, page_type: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration document: {0}")]
    Document(#[from] DocumentError),

    #[error("Baseline error: {0}")]
    Baseline(String),

    #[error("Draft cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PersistenceError::Parse(err.to_string())
        } else {
            PersistenceError::Network(err.to_string())
        }
    }
}

pub type SlotResult<T> = Result<T, SlotError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;
