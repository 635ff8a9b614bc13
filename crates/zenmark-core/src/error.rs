//! Error types for zenmark-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using zenmark-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in zenmark-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document, version or folder not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A programming defect, e.g. appending a duplicate version number
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The document is in conflict and must be resolved explicitly first
    #[error("Document {0} has an unresolved sync conflict")]
    UnresolvedConflict(String),

    /// The document was edited locally while a resolution was being pushed
    #[error("Document {0} changed locally during resolution; resolve it again")]
    ChangedDuringResolve(String),

    /// Folder move would place a folder inside itself or a descendant
    #[error("Move would create cycle: folder {folder} under {target}")]
    CycleDetected { folder: String, target: String },

    /// Remote replica store error
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Whether this error came from talking to the remote replica.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
