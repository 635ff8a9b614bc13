//! Version ledger repository implementation

use libsql::{params, Connection, Row};

use super::parse_id;
use crate::error::Result;
use crate::models::{DocumentId, VersionId, VersionSnapshot};

const VERSION_COLUMNS: &str = "id, document_id, version_number, content, created_at, device_id";

/// Trait for version snapshot storage operations (async)
///
/// There is deliberately no update or delete: snapshots are append-only.
#[allow(async_fn_in_trait)]
pub trait VersionRepository {
    /// Append a snapshot
    async fn insert(&self, snapshot: &VersionSnapshot) -> Result<()>;

    /// Get a snapshot by ID
    async fn get(&self, id: &VersionId) -> Result<Option<VersionSnapshot>>;

    /// All snapshots of a document, highest version number first
    async fn list_for_document(&self, document_id: &DocumentId) -> Result<Vec<VersionSnapshot>>;

    /// Snapshot with the highest version number
    async fn head(&self, document_id: &DocumentId) -> Result<Option<VersionSnapshot>>;

    /// Highest version number recorded for a document, 0 when none
    async fn latest_number(&self, document_id: &DocumentId) -> Result<i64>;
}

/// libSQL implementation of `VersionRepository`
pub struct LibSqlVersionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlVersionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_snapshot(row: &Row) -> Result<VersionSnapshot> {
        let id: String = row.get(0)?;
        let document_id: String = row.get(1)?;
        Ok(VersionSnapshot {
            id: parse_id(&id, "version")?,
            document_id: parse_id(&document_id, "document")?,
            version_number: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            device_id: row.get(5)?,
        })
    }
}

impl VersionRepository for LibSqlVersionRepository<'_> {
    async fn insert(&self, snapshot: &VersionSnapshot) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO doc_versions (id, document_id, version_number, content, created_at, device_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    snapshot.id.as_str(),
                    snapshot.document_id.as_str(),
                    snapshot.version_number,
                    snapshot.content.as_str(),
                    snapshot.created_at,
                    snapshot.device_id.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &VersionId) -> Result<Option<VersionSnapshot>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {VERSION_COLUMNS} FROM doc_versions WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_snapshot(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_document(&self, document_id: &DocumentId) -> Result<Vec<VersionSnapshot>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {VERSION_COLUMNS}
                     FROM doc_versions
                     WHERE document_id = ?
                     ORDER BY version_number DESC"
                ),
                [document_id.as_str()],
            )
            .await?;

        let mut snapshots = Vec::new();
        while let Some(row) = rows.next().await? {
            snapshots.push(Self::parse_snapshot(&row)?);
        }
        Ok(snapshots)
    }

    async fn head(&self, document_id: &DocumentId) -> Result<Option<VersionSnapshot>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {VERSION_COLUMNS}
                     FROM doc_versions
                     WHERE document_id = ?
                     ORDER BY version_number DESC
                     LIMIT 1"
                ),
                [document_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_snapshot(&row)?)),
            None => Ok(None),
        }
    }

    async fn latest_number(&self, document_id: &DocumentId) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(MAX(version_number), 0) FROM doc_versions WHERE document_id = ?",
                [document_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DocumentRepository, LibSqlDocumentRepository};
    use crate::models::Document;

    async fn setup() -> (Database, Document) {
        let db = Database::open_in_memory().await.unwrap();
        let doc = Document::new("user-1", "Ledger");
        LibSqlDocumentRepository::new(db.connection())
            .put(&doc)
            .await
            .unwrap();
        (db, doc)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_list_newest_first() {
        let (db, doc) = setup().await;
        let repo = LibSqlVersionRepository::new(db.connection());

        for (number, content) in [(1, ""), (2, "hello"), (5, "later")] {
            repo.insert(&VersionSnapshot::new(doc.id, number, content, "laptop"))
                .await
                .unwrap();
        }

        let numbers = repo
            .list_for_document(&doc.id)
            .await
            .unwrap()
            .iter()
            .map(|snapshot| snapshot.version_number)
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec![5, 2, 1]);
        assert_eq!(repo.latest_number(&doc.id).await.unwrap(), 5);
        let head = repo.head(&doc.id).await.unwrap().unwrap();
        assert_eq!((head.version_number, head.content.as_str()), (5, "later"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_number_rejected_by_schema() {
        let (db, doc) = setup().await;
        let repo = LibSqlVersionRepository::new(db.connection());

        repo.insert(&VersionSnapshot::new(doc.id, 1, "", "laptop"))
            .await
            .unwrap();
        let duplicate = repo
            .insert(&VersionSnapshot::new(doc.id, 1, "again", "laptop"))
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_latest_number_defaults_to_zero() {
        let (db, doc) = setup().await;
        let repo = LibSqlVersionRepository::new(db.connection());
        assert_eq!(repo.latest_number(&doc.id).await.unwrap(), 0);
        assert!(repo.head(&doc.id).await.unwrap().is_none());
        assert!(repo.get(&VersionId::new()).await.unwrap().is_none());
    }
}
