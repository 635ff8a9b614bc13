//! Document model

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use super::folder::FolderId;
use crate::error::{Error, Result};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?([a-zA-Z][a-zA-Z0-9_-]*)$").expect("Invalid regex"));

/// Title used when a document is created without one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// A unique identifier for a document, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID using UUID v7
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

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle of a document or folder.
///
/// Deleted records stay in the local replica (soft delete) so the deletion
/// can be reconciled; they are excluded from every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted,
}

impl Lifecycle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    #[must_use]
    pub const fn from_deleted_flag(is_deleted: bool) -> Self {
        if is_deleted {
            Self::Deleted
        } else {
            Self::Active
        }
    }

    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl FromStr for Lifecycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            other => Err(Error::Database(format!("unknown lifecycle state '{other}'"))),
        }
    }
}

/// A markdown document owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: DocumentId,
    /// Owning user identifier
    pub owner_id: String,
    /// Display title
    pub title: String,
    /// Markdown content
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last mutation timestamp (Unix ms), the only input to conflict checks
    pub updated_at: i64,
    /// Version number of the latest ledger snapshot
    pub current_version: i64,
    /// Tags; local input is normalized, remote tags are stored as received
    pub tags: BTreeSet<String>,
    /// Active or soft-deleted
    pub lifecycle: Lifecycle,
    /// Parent folder, `None` for the root
    pub folder_id: Option<FolderId>,
}

impl Document {
    /// Create a new empty document at version 1
    #[must_use]
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let title = title.into().trim().to_string();
        Self {
            id: DocumentId::new(),
            owner_id: owner_id.into(),
            title: if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title
            },
            content: String::new(),
            created_at: now,
            updated_at: now,
            current_version: 1,
            tags: BTreeSet::new(),
            lifecycle: Lifecycle::Active,
            folder_id: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.lifecycle.is_deleted()
    }

    /// Case-insensitive match of `query` against title and content
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query) || self.content.to_lowercase().contains(&query)
    }

    /// Get first content line as preview, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim()
            .chars()
            .take(max_len)
            .collect()
    }
}

/// Partial update applied by `DocumentManager::update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

impl DocumentPatch {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }

    /// Merge the present fields into `document`.
    pub fn apply_to(self, document: &mut Document) {
        if let Some(title) = self.title {
            let title = title.trim();
            document.title = if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title.to_string()
            };
        }
        if let Some(content) = self.content {
            document.content = content;
        }
        if let Some(tags) = self.tags {
            document.tags = tags;
        }
    }
}

/// Normalize a single tag name.
///
/// Valid tags match `#?[a-zA-Z][a-zA-Z0-9_-]*`; the leading `#` is dropped
/// and the name is lowercased.
pub fn normalize_tag(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    TAG_PATTERN
        .captures(trimmed)
        .map(|captures| captures[1].to_lowercase())
        .ok_or_else(|| Error::InvalidInput(format!("invalid tag '{trimmed}'")))
}

/// Normalize and deduplicate a list of tag names.
pub fn normalize_tags<I, S>(raw: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}
