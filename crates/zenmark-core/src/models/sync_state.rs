//! Per-document sync state model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::document::DocumentId;
use crate::error::Error;

/// Reconciliation status of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local and remote copies agree as of the last pass
    Synced,
    /// Local mutations not yet pushed
    Pending,
    /// Both replicas diverged; needs an explicit resolution
    Conflict,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(Self::Synced),
            "pending" => Ok(Self::Pending),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::Database(format!("unknown sync status '{other}'"))),
        }
    }
}

/// Sync metadata row, one per local document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub document_id: DocumentId,
    pub status: SyncStatus,
    /// Last successful push or pull (Unix ms), 0 when never synced.
    pub last_synced_at: i64,
}

impl SyncState {
    /// Initial state of a freshly created local document.
    #[must_use]
    pub const fn pending(document_id: DocumentId) -> Self {
        Self {
            document_id,
            status: SyncStatus::Pending,
            last_synced_at: 0,
        }
    }

    #[must_use]
    pub const fn synced(document_id: DocumentId, at: i64) -> Self {
        Self {
            document_id,
            status: SyncStatus::Synced,
            last_synced_at: at,
        }
    }
}
