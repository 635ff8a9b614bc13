//! Local replica services: the handle to the store and the managers that
//! mutate it.

mod documents;
mod folders;
mod local_store;
mod session;
mod versions;

pub use documents::{DocumentManager, DocumentSummary};
pub use folders::FolderManager;
pub use local_store::LocalStore;
pub use session::Session;
pub use versions::{VersionLedger, REMOTE_DEVICE_MARKER};

pub(crate) use versions::adopt_document;
