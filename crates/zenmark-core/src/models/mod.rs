//! Data models for ZenMark

mod document;
mod folder;
mod sync_state;
mod version;

pub use document::{
    normalize_tag, normalize_tags, Document, DocumentId, DocumentPatch, Lifecycle, DEFAULT_TITLE,
};
pub use folder::{Folder, FolderId};
pub(crate) use folder::normalize_folder_name;
pub use sync_state::{SyncState, SyncStatus};
pub use version::{VersionId, VersionSnapshot};
