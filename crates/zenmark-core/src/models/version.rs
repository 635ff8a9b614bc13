//! Version snapshot model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::document::DocumentId;

/// A unique identifier for a version snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(Uuid);

impl VersionId {
    /// Create a new unique version ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Immutable copy of a document's content at one version number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub id: VersionId,
    pub document_id: DocumentId,
    pub version_number: i64,
    pub content: String,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Device that wrote the snapshot.
    pub device_id: String,
}

impl VersionSnapshot {
    #[must_use]
    pub fn new(
        document_id: DocumentId,
        version_number: i64,
        content: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: VersionId::new(),
            document_id,
            version_number,
            content: content.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
            device_id: device_id.into(),
        }
    }
}
