//! Version ledger: append-only snapshots and rollback-as-new-version.

use libsql::Connection;

use super::LocalStore;
use crate::db::{
    DocumentRepository, LibSqlDocumentRepository, LibSqlSyncStateRepository,
    LibSqlVersionRepository, SyncStateRepository, VersionRepository,
};
use crate::models::{Document, DocumentId, VersionId, VersionSnapshot};
use crate::util::next_modified;
use crate::{Error, Result};

/// Device marker recorded on snapshots adopted from the remote replica.
pub const REMOTE_DEVICE_MARKER: &str = "remote";

/// Writer of version snapshots and of `Document::current_version`.
#[derive(Clone)]
pub struct VersionLedger {
    store: LocalStore,
    device_id: String,
}

impl VersionLedger {
    pub fn new(store: LocalStore, device_id: impl Into<String>) -> Self {
        Self {
            store,
            device_id: device_id.into(),
        }
    }

    /// Append a snapshot of `content` at `version_number`.
    ///
    /// The number must be strictly greater than every number already
    /// recorded for the document. The document's current version follows
    /// the new head and the document is marked dirty.
    pub async fn create_version(
        &self,
        document_id: &DocumentId,
        content: &str,
        version_number: i64,
    ) -> Result<VersionSnapshot> {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<VersionSnapshot> = async {
            let conn = db.connection();
            let mut document = load_document(conn, document_id).await?;
            let snapshot =
                append_snapshot(conn, document_id, version_number, content, &self.device_id)
                    .await?;
            document.current_version = version_number;
            document.updated_at = next_modified(document.updated_at);
            LibSqlDocumentRepository::new(conn).put(&document).await?;
            LibSqlSyncStateRepository::new(conn)
                .mark_dirty(document_id)
                .await?;
            Ok(snapshot)
        }
        .await;
        db.finish(result).await
    }

    /// All snapshots of a document, newest version first.
    pub async fn history(&self, document_id: &DocumentId) -> Result<Vec<VersionSnapshot>> {
        let db = self.store.lock().await;
        LibSqlVersionRepository::new(db.connection())
            .list_for_document(document_id)
            .await
    }

    /// Snapshot the live content as the next version.
    pub async fn checkpoint(&self, document_id: &DocumentId) -> Result<VersionSnapshot> {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<VersionSnapshot> = async {
            let conn = db.connection();
            let mut document = load_document(conn, document_id).await?;
            let number = document.current_version + 1;
            let snapshot =
                append_snapshot(conn, document_id, number, &document.content, &self.device_id)
                    .await?;
            document.current_version = number;
            document.updated_at = next_modified(document.updated_at);
            LibSqlDocumentRepository::new(conn).put(&document).await?;
            LibSqlSyncStateRepository::new(conn)
                .mark_dirty(document_id)
                .await?;
            tracing::debug!("Checkpointed document {} at version {}", document_id, number);
            Ok(snapshot)
        }
        .await;
        db.finish(result).await
    }

    /// Restore the content of `version_id` as a new version.
    ///
    /// The restored snapshot itself is left untouched. Returns the restored
    /// content.
    pub async fn rollback_to(
        &self,
        document_id: &DocumentId,
        version_id: &VersionId,
    ) -> Result<String> {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<String> = async {
            let conn = db.connection();
            let mut document = load_document(conn, document_id).await?;
            let target = LibSqlVersionRepository::new(conn)
                .get(version_id)
                .await?
                .filter(|snapshot| snapshot.document_id == *document_id)
                .ok_or_else(|| {
                    Error::NotFound(format!("version {version_id} of document {document_id}"))
                })?;

            let number = document.current_version + 1;
            append_snapshot(conn, document_id, number, &target.content, &self.device_id).await?;
            document.content.clone_from(&target.content);
            document.current_version = number;
            document.updated_at = next_modified(document.updated_at);
            LibSqlDocumentRepository::new(conn).put(&document).await?;
            LibSqlSyncStateRepository::new(conn)
                .mark_dirty(document_id)
                .await?;
            tracing::info!(
                "Rolled back document {} to version {} as version {}",
                document_id,
                target.version_number,
                number
            );
            Ok(target.content)
        }
        .await;
        db.finish(result).await
    }
}

async fn load_document(conn: &Connection, document_id: &DocumentId) -> Result<Document> {
    LibSqlDocumentRepository::new(conn)
        .get(document_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("document {document_id}")))
}

/// Append one snapshot after checking the numbering invariant.
///
/// Must run inside the caller's transaction.
pub(crate) async fn append_snapshot(
    conn: &Connection,
    document_id: &DocumentId,
    version_number: i64,
    content: &str,
    device_id: &str,
) -> Result<VersionSnapshot> {
    let versions = LibSqlVersionRepository::new(conn);
    let latest = versions.latest_number(document_id).await?;
    if version_number <= latest {
        tracing::error!(
            "Refusing version {} for document {}: latest is {}",
            version_number,
            document_id,
            latest
        );
        return Err(Error::InvariantViolation(format!(
            "version {version_number} of document {document_id} is not greater than {latest}"
        )));
    }

    let snapshot = VersionSnapshot::new(*document_id, version_number, content, device_id);
    versions.insert(&snapshot).await?;
    Ok(snapshot)
}

/// Store a document received from the remote replica, recording its
/// content in the ledger so `current_version` keeps naming the head.
///
/// Sync state is left to the caller. Must run inside the caller's
/// transaction.
///
/// When the ledger head already holds the same content at a number no lower
/// than the remote one, it is reused instead of appending a duplicate.
pub(crate) async fn adopt_document(conn: &Connection, mut incoming: Document) -> Result<Document> {
    let head = LibSqlVersionRepository::new(conn).head(&incoming.id).await?;
    let local_head = head.as_ref().map_or(0, |snapshot| snapshot.version_number);
    let reuse_head = head.as_ref().is_some_and(|snapshot| {
        snapshot.content == incoming.content && snapshot.version_number >= incoming.current_version
    });

    if reuse_head {
        incoming.current_version = local_head;
        LibSqlDocumentRepository::new(conn).put(&incoming).await?;
        return Ok(incoming);
    }

    let number = if incoming.current_version > local_head {
        incoming.current_version
    } else {
        local_head + 1
    };
    incoming.current_version = number;
    // Snapshots reference the document row, so it must exist first.
    LibSqlDocumentRepository::new(conn).put(&incoming).await?;
    append_snapshot(
        conn,
        &incoming.id,
        number,
        &incoming.content,
        REMOTE_DEVICE_MARKER,
    )
    .await?;
    Ok(incoming)
}
