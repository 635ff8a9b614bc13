use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] zenmark_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Document ID cannot be empty")]
    EmptyId,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Document not found for id/prefix: {0}")]
    DocumentNotFound(String),
    #[error("Folder not found for id/prefix: {0}")]
    FolderNotFound(String),
    #[error("Version {0} not found")]
    VersionNotFound(i64),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `zenmark config init --remote-url <URL> --api-key <KEY>`, or set ZENMARK_REMOTE_URL and ZENMARK_API_KEY."
    )]
    SyncNotConfigured,
}
