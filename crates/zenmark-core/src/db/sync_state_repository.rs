//! Sync state repository implementation

use libsql::{params, Connection, Row};

use super::parse_id;
use crate::error::Result;
use crate::models::{DocumentId, SyncState, SyncStatus};

/// Trait for per-document sync metadata (async)
#[allow(async_fn_in_trait)]
pub trait SyncStateRepository {
    /// Get the sync state of a document
    async fn get(&self, document_id: &DocumentId) -> Result<Option<SyncState>>;

    /// Insert or replace the whole sync state record
    async fn put(&self, state: &SyncState) -> Result<()>;

    /// Mark a document dirty after a local mutation.
    ///
    /// A document in `conflict` stays in `conflict`: only an explicit
    /// resolution may move it on.
    async fn mark_dirty(&self, document_id: &DocumentId) -> Result<()>;

    /// Sync states with `status` for documents owned by `owner_id`
    async fn list_by_status(&self, owner_id: &str, status: SyncStatus) -> Result<Vec<SyncState>>;
}

/// libSQL implementation of `SyncStateRepository`
pub struct LibSqlSyncStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_state(row: &Row) -> Result<SyncState> {
        let document_id: String = row.get(0)?;
        let status: String = row.get(1)?;
        Ok(SyncState {
            document_id: parse_id(&document_id, "document")?,
            status: status.parse()?,
            last_synced_at: row.get(2)?,
        })
    }
}

impl SyncStateRepository for LibSqlSyncStateRepository<'_> {
    async fn get(&self, document_id: &DocumentId) -> Result<Option<SyncState>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document_id, status, last_synced_at FROM sync_state WHERE document_id = ?",
                [document_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_state(&row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, state: &SyncState) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_state (document_id, status, last_synced_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(document_id) DO UPDATE SET
                    status = excluded.status,
                    last_synced_at = excluded.last_synced_at",
                params![
                    state.document_id.as_str(),
                    state.status.as_str(),
                    state.last_synced_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn mark_dirty(&self, document_id: &DocumentId) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_state (document_id, status, last_synced_at)
                 VALUES (?, 'pending', 0)
                 ON CONFLICT(document_id) DO UPDATE SET
                    status = CASE
                        WHEN sync_state.status = 'conflict' THEN 'conflict'
                        ELSE 'pending'
                    END",
                [document_id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn list_by_status(&self, owner_id: &str, status: SyncStatus) -> Result<Vec<SyncState>> {
        let mut rows = self
            .conn
            .query(
                "SELECT s.document_id, s.status, s.last_synced_at
                 FROM sync_state s
                 JOIN documents d ON d.id = s.document_id
                 WHERE d.owner_id = ? AND s.status = ?
                 ORDER BY d.updated_at ASC",
                params![owner_id, status.as_str()],
            )
            .await?;

        let mut states = Vec::new();
        while let Some(row) = rows.next().await? {
            states.push(Self::parse_state(&row)?);
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DocumentRepository, LibSqlDocumentRepository};
    use crate::models::Document;

    async fn setup_with(owner: &str) -> (Database, Document) {
        let db = Database::open_in_memory().await.unwrap();
        let doc = Document::new(owner, "Synced doc");
        LibSqlDocumentRepository::new(db.connection())
            .put(&doc)
            .await
            .unwrap();
        (db, doc)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let (db, doc) = setup_with("user-1").await;
        let repo = LibSqlSyncStateRepository::new(db.connection());

        repo.put(&SyncState::synced(doc.id, 42)).await.unwrap();
        let state = repo.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(state.status, SyncStatus::Synced);
        assert_eq!(state.last_synced_at, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_dirty_keeps_last_synced_at() {
        let (db, doc) = setup_with("user-1").await;
        let repo = LibSqlSyncStateRepository::new(db.connection());

        repo.put(&SyncState::synced(doc.id, 42)).await.unwrap();
        repo.mark_dirty(&doc.id).await.unwrap();

        let state = repo.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(state.status, SyncStatus::Pending);
        assert_eq!(state.last_synced_at, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_dirty_never_clears_conflict() {
        let (db, doc) = setup_with("user-1").await;
        let repo = LibSqlSyncStateRepository::new(db.connection());

        repo.put(&SyncState {
            document_id: doc.id,
            status: SyncStatus::Conflict,
            last_synced_at: 7,
        })
        .await
        .unwrap();
        repo.mark_dirty(&doc.id).await.unwrap();

        let state = repo.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(state.status, SyncStatus::Conflict);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_status_filters_owner() {
        let (db, doc) = setup_with("user-1").await;
        let foreign = Document::new("user-2", "Other");
        LibSqlDocumentRepository::new(db.connection())
            .put(&foreign)
            .await
            .unwrap();

        let repo = LibSqlSyncStateRepository::new(db.connection());
        repo.put(&SyncState::pending(doc.id)).await.unwrap();
        repo.put(&SyncState::pending(foreign.id)).await.unwrap();

        let pending = repo
            .list_by_status("user-1", SyncStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].document_id, doc.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_state_requires_document() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncStateRepository::new(db.connection());
        let orphan = repo.put(&SyncState::pending(DocumentId::new())).await;
        assert!(orphan.is_err());
    }
}
