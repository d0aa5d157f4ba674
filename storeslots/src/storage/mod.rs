pub mod draft_cache;

pub use draft_cache::{DraftCache, PendingDraft};
