//! Document lifecycle: create, edit, soft-delete, list and move.

use libsql::Connection;
use serde::Serialize;

use super::versions::append_snapshot;
use super::LocalStore;
use crate::db::{
    DocumentRepository, FolderRepository, LibSqlDocumentRepository, LibSqlFolderRepository,
    LibSqlSyncStateRepository, SyncStateRepository,
};
use crate::models::{
    Document, DocumentId, DocumentPatch, FolderId, Lifecycle, SyncState, SyncStatus,
};
use crate::util::next_modified;
use crate::{Error, Result};

/// An active document paired with its reconciliation status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: Document,
    pub status: SyncStatus,
}

/// Sole writer of document records on behalf of local edits.
#[derive(Clone)]
pub struct DocumentManager {
    store: LocalStore,
    device_id: String,
}

impl DocumentManager {
    pub fn new(store: LocalStore, device_id: impl Into<String>) -> Self {
        Self {
            store,
            device_id: device_id.into(),
        }
    }

    /// Create an empty document at version 1 with its initial snapshot.
    pub async fn create(&self, user_id: &str, title: &str) -> Result<Document> {
        if user_id.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        let document = Document::new(user_id, title);

        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<()> = async {
            let conn = db.connection();
            LibSqlDocumentRepository::new(conn).put(&document).await?;
            append_snapshot(
                conn,
                &document.id,
                document.current_version,
                &document.content,
                &self.device_id,
            )
            .await?;
            LibSqlSyncStateRepository::new(conn)
                .put(&SyncState::pending(document.id))
                .await
        }
        .await;
        db.finish(result).await?;

        tracing::debug!("Created document {} for {}", document.id, user_id);
        Ok(document)
    }

    /// Merge `patch` into an active document.
    ///
    /// Returns `None` when there is no such active document. An empty patch
    /// leaves the document untouched.
    pub async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Option<Document>> {
        if patch.is_empty() {
            return Ok(self.get(id).await?.filter(Document::is_active));
        }
        self.mutate(id, |document| {
            patch.apply_to(document);
            Ok(())
        })
        .await
    }

    /// Soft-delete a document. Returns `false` when there was nothing to delete.
    pub async fn delete(&self, id: &DocumentId) -> Result<bool> {
        let deleted = self
            .mutate(id, |document| {
                document.lifecycle = Lifecycle::Deleted;
                Ok(())
            })
            .await?;
        Ok(deleted.is_some())
    }

    /// Load a document, including soft-deleted ones.
    pub async fn get(&self, id: &DocumentId) -> Result<Option<Document>> {
        let db = self.store.lock().await;
        LibSqlDocumentRepository::new(db.connection()).get(id).await
    }

    /// Active documents of `user_id`, most recently modified first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<DocumentSummary>> {
        let db = self.store.lock().await;
        let conn = db.connection();
        let documents = LibSqlDocumentRepository::new(conn)
            .list_by_owner(user_id)
            .await?;
        summarize(conn, documents).await
    }

    /// Active documents whose title or content contains `query`, ignoring case.
    pub async fn search(&self, user_id: &str, query: &str) -> Result<Vec<DocumentSummary>> {
        let db = self.store.lock().await;
        let conn = db.connection();
        let documents = LibSqlDocumentRepository::new(conn)
            .list_by_owner(user_id)
            .await?
            .into_iter()
            .filter(|document| document.matches(query))
            .collect();
        summarize(conn, documents).await
    }

    /// Active documents directly inside `folder` (`None` = root).
    pub async fn list_in_folder(
        &self,
        user_id: &str,
        folder: Option<&FolderId>,
    ) -> Result<Vec<Document>> {
        let db = self.store.lock().await;
        LibSqlDocumentRepository::new(db.connection())
            .list_in_folder(user_id, folder)
            .await
    }

    /// IDs of active documents starting with `prefix`.
    pub async fn find_ids_by_prefix(
        &self,
        user_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let db = self.store.lock().await;
        LibSqlDocumentRepository::new(db.connection())
            .list_ids_by_prefix(user_id, prefix, limit)
            .await
    }

    /// Reparent a document; `None` moves it to the root.
    pub async fn move_to(&self, id: &DocumentId, target: Option<FolderId>) -> Result<Document> {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<Document> = async {
            let conn = db.connection();
            let mut document = LibSqlDocumentRepository::new(conn)
                .get(id)
                .await?
                .filter(Document::is_active)
                .ok_or_else(|| Error::NotFound(format!("document {id}")))?;

            if let Some(folder_id) = target {
                let folder = LibSqlFolderRepository::new(conn)
                    .get(&folder_id)
                    .await?
                    .filter(|folder| folder.is_active() && folder.owner_id == document.owner_id);
                if folder.is_none() {
                    return Err(Error::NotFound(format!("folder {folder_id}")));
                }
            }

            document.folder_id = target;
            touch(conn, &mut document).await?;
            Ok(document)
        }
        .await;
        db.finish(result).await
    }

    async fn mutate<F>(&self, id: &DocumentId, change: F) -> Result<Option<Document>>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<Option<Document>> = async {
            let conn = db.connection();
            let Some(mut document) = LibSqlDocumentRepository::new(conn)
                .get(id)
                .await?
                .filter(Document::is_active)
            else {
                return Ok(None);
            };

            change(&mut document)?;
            touch(conn, &mut document).await?;
            Ok(Some(document))
        }
        .await;
        db.finish(result).await
    }
}

/// Refresh last-modified, write the whole record and mark it dirty.
pub(crate) async fn touch(conn: &Connection, document: &mut Document) -> Result<()> {
    document.updated_at = next_modified(document.updated_at);
    LibSqlDocumentRepository::new(conn).put(document).await?;
    LibSqlSyncStateRepository::new(conn)
        .mark_dirty(&document.id)
        .await
}

async fn summarize(conn: &Connection, documents: Vec<Document>) -> Result<Vec<DocumentSummary>> {
    let states = LibSqlSyncStateRepository::new(conn);
    let mut summaries = Vec::with_capacity(documents.len());
    for document in documents {
        let status = states
            .get(&document.id)
            .await?
            .map_or(SyncStatus::Pending, |state| state.status);
        summaries.push(DocumentSummary { document, status });
    }
    Ok(summaries)
}
