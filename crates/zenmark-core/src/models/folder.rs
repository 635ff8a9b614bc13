//! Folder model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::document::Lifecycle;
use crate::error::{Error, Result};

/// A unique identifier for a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderId(Uuid);

impl FolderId {
    /// Create a new unique folder ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FolderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A folder in a user's document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub owner_id: String,
    pub name: String,
    /// Parent folder, `None` for the root
    pub parent_id: Option<FolderId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    pub lifecycle: Lifecycle,
}

impl Folder {
    /// Create a new folder, rejecting blank names
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        parent_id: Option<FolderId>,
    ) -> Result<Self> {
        let name = normalize_folder_name(name.into())?;
        let now = chrono::Utc::now().timestamp_millis();
        Ok(Self {
            id: FolderId::new(),
            owner_id: owner_id.into(),
            name,
            parent_id,
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        })
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted()
    }
}

pub(crate) fn normalize_folder_name(name: String) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Folder name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
