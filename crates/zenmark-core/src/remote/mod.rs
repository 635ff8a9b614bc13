//! Remote replica store seam.
//!
//! The reconciler only ever talks to the remote side through [`RemoteStore`].
//! [`RestRemoteStore`] speaks a PostgREST-style HTTP API; [`InMemoryRemoteStore`]
//! keeps everything in process and can inject failures.

mod memory;
mod rest;

pub use memory::InMemoryRemoteStore;
pub use rest::RestRemoteStore;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Document, DocumentId, FolderId, Lifecycle};

/// Errors raised while talking to the remote replica
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Remote request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Remote store is unreachable")]
    Unreachable,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote replica of one user's document collection.
///
/// `get_one` distinguishes "not found" (`Ok(None)`) from transport failure
/// (`Err`). `upsert` replaces the whole record.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Cheap connectivity probe; `false` means the pass should not start.
    async fn is_reachable(&self) -> bool;

    async fn get_one(&self, id: &DocumentId) -> RemoteResult<Option<RemoteDocument>>;

    async fn upsert(&self, document: &RemoteDocument) -> RemoteResult<()>;

    /// All documents of `owner_id`, including soft-deleted ones.
    async fn query_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<RemoteDocument>>;
}

/// Wire representation of a document row in the remote `documents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub current_version: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl RemoteDocument {
    /// Parse the document identifier.
    pub fn document_id(&self) -> RemoteResult<DocumentId> {
        self.id
            .parse()
            .map_err(|_| RemoteError::InvalidPayload(format!("invalid document id '{}'", self.id)))
    }
}

impl From<&Document> for RemoteDocument {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.as_str(),
            user_id: document.owner_id.clone(),
            title: document.title.clone(),
            content: document.content.clone(),
            created_at: document.created_at,
            updated_at: document.updated_at,
            current_version: document.current_version,
            tags: document.tags.iter().cloned().collect(),
            is_deleted: document.lifecycle.is_deleted(),
            folder_id: document.folder_id.map(|id| id.as_str()),
        }
    }
}

impl TryFrom<RemoteDocument> for Document {
    type Error = RemoteError;

    fn try_from(remote: RemoteDocument) -> RemoteResult<Self> {
        let id = remote.document_id()?;
        let folder_id = remote
            .folder_id
            .as_deref()
            .map(|raw| {
                raw.parse::<FolderId>().map_err(|_| {
                    RemoteError::InvalidPayload(format!("invalid folder id '{raw}'"))
                })
            })
            .transpose()?;
        if remote.current_version < 1 {
            return Err(RemoteError::InvalidPayload(format!(
                "document {id} has version {}",
                remote.current_version
            )));
        }

        Ok(Self {
            id,
            owner_id: remote.user_id,
            title: remote.title,
            content: remote.content,
            created_at: remote.created_at,
            updated_at: remote.updated_at,
            current_version: remote.current_version,
            // Other clients may write tags outside our naming rules; keep them as is.
            tags: remote.tags.into_iter().collect(),
            lifecycle: Lifecycle::from_deleted_flag(remote.is_deleted),
            folder_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalize_tags;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_conversion_preserves_fields() {
        let mut doc = Document::new("user-1", "Wire");
        doc.content = "body".to_string();
        doc.tags = normalize_tags(["a", "b"]).unwrap();
        doc.folder_id = Some(FolderId::new());
        doc.lifecycle = Lifecycle::Deleted;

        let remote = RemoteDocument::from(&doc);
        assert!(remote.is_deleted);
        assert_eq!(Document::try_from(remote).unwrap(), doc);
    }

    #[test]
    fn test_payload_uses_wire_column_names() {
        let doc = Document::new("user-1", "Wire");
        let json = serde_json::to_value(RemoteDocument::from(&doc)).unwrap();
        for column in [
            "id",
            "user_id",
            "title",
            "content",
            "created_at",
            "updated_at",
            "current_version",
            "tags",
            "is_deleted",
            "folder_id",
        ] {
            assert!(json.get(column).is_some(), "missing column {column}");
        }
    }

    #[test]
    fn test_invalid_remote_id_is_payload_error() {
        let mut remote = RemoteDocument::from(&Document::new("user-1", "x"));
        remote.id = "not-a-uuid".to_string();
        assert!(matches!(
            Document::try_from(remote),
            Err(RemoteError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_foreign_tags_are_kept_verbatim() {
        let mut remote = RemoteDocument::from(&Document::new("user-1", "x"));
        remote.tags = vec!["Work".to_string(), "has space".to_string(), "2024".to_string()];
        let doc = Document::try_from(remote).unwrap();
        assert_eq!(
            doc.tags.into_iter().collect::<Vec<_>>(),
            vec!["2024", "Work", "has space"]
        );
    }
}
