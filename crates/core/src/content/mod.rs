//! Content records and their persistence.
//!
//! A content record owns three keyed media lists (images, videos, 3D objects)
//! plus the status that tracks whether its media is still being produced.

mod ids;
mod sqlite_store;
mod store;
mod types;

pub use ids::{generate_ref_id, new_content_id, unique_ref_id, REF_ID_LENGTH};
pub use sqlite_store::SqliteContentStore;
pub use store::{bounded, ContentError, ContentFilter, ContentStore};
pub use types::{
    ContentPatch, ContentRecord, ContentStatus, MediaEntry, MediaKind, MediaMerge,
};
