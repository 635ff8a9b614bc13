//! Document repository implementation

use libsql::{params, Connection, Row, Value};

use super::{nullable_text, optional_text, parse_id};
use crate::error::Result;
use crate::models::{Document, DocumentId, FolderId};

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, content, created_at, updated_at, \
     current_version, tags, lifecycle, folder_id";

/// Trait for document storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DocumentRepository {
    /// Get a document by ID, including soft-deleted ones
    async fn get(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// Insert or replace the whole document record
    async fn put(&self, document: &Document) -> Result<()>;

    /// List an owner's active documents, most recently modified first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// List an owner's active documents directly inside `folder` (`None` = root)
    async fn list_in_folder(
        &self,
        owner_id: &str,
        folder: Option<&FolderId>,
    ) -> Result<Vec<Document>>;

    /// IDs of an owner's active documents starting with `prefix`
    async fn list_ids_by_prefix(
        &self,
        owner_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>>;
}

/// libSQL implementation of `DocumentRepository`
pub struct LibSqlDocumentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDocumentRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a document from a database row
    fn parse_document(row: &Row) -> Result<Document> {
        let id: String = row.get(0)?;
        let tags: String = row.get(7)?;
        let lifecycle: String = row.get(8)?;
        let folder_id = optional_text(row, 9)?
            .map(|raw| parse_id::<FolderId>(&raw, "folder"))
            .transpose()?;

        Ok(Document {
            id: parse_id(&id, "document")?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            current_version: row.get(6)?,
            tags: serde_json::from_str(&tags)?,
            lifecycle: lifecycle.parse()?,
            folder_id,
        })
    }

    async fn collect(&self, mut rows: libsql::Rows) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Self::parse_document(&row)?);
        }
        Ok(documents)
    }
}

impl DocumentRepository for LibSqlDocumentRepository<'_> {
    async fn get(&self, id: &DocumentId) -> Result<Option<Document>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, document: &Document) -> Result<()> {
        let tags = serde_json::to_string(&document.tags)?;
        self.conn
            .execute(
                "INSERT INTO documents (id, owner_id, title, content, created_at, updated_at,
                                        current_version, tags, lifecycle, folder_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    title = excluded.title,
                    content = excluded.content,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    current_version = excluded.current_version,
                    tags = excluded.tags,
                    lifecycle = excluded.lifecycle,
                    folder_id = excluded.folder_id",
                params![
                    document.id.as_str(),
                    document.owner_id.as_str(),
                    document.title.as_str(),
                    document.content.as_str(),
                    document.created_at,
                    document.updated_at,
                    document.current_version,
                    tags,
                    document.lifecycle.as_str(),
                    nullable_text(document.folder_id.map(|id| id.as_str())),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Document>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS}
                     FROM documents
                     WHERE owner_id = ? AND lifecycle = 'active'
                     ORDER BY updated_at DESC"
                ),
                [owner_id],
            )
            .await?;
        self.collect(rows).await
    }

    async fn list_in_folder(
        &self,
        owner_id: &str,
        folder: Option<&FolderId>,
    ) -> Result<Vec<Document>> {
        let rows = match folder {
            Some(folder_id) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {DOCUMENT_COLUMNS}
                             FROM documents
                             WHERE owner_id = ? AND folder_id = ? AND lifecycle = 'active'
                             ORDER BY updated_at DESC"
                        ),
                        params![owner_id, folder_id.as_str()],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {DOCUMENT_COLUMNS}
                             FROM documents
                             WHERE owner_id = ? AND folder_id IS NULL AND lifecycle = 'active'
                             ORDER BY updated_at DESC"
                        ),
                        [owner_id],
                    )
                    .await?
            }
        };
        self.collect(rows).await
    }

    async fn list_ids_by_prefix(
        &self,
        owner_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM documents
                 WHERE owner_id = ?1 AND lifecycle = 'active'
                   AND substr(id, 1, length(?2)) = ?2
                 ORDER BY id
                 LIMIT ?3",
                params![owner_id, prefix, Value::Integer(limit)],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{normalize_tags, Lifecycle};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn document_at(owner: &str, title: &str, updated_at: i64) -> Document {
        let mut doc = Document::new(owner, title);
        doc.updated_at = updated_at;
        doc
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let mut doc = Document::new("user-1", "Ideas");
        doc.content = "# Ideas\n- one".to_string();
        doc.tags = normalize_tags(["rust", "notes"]).unwrap();
        repo.put(&doc).await.unwrap();

        let fetched = repo.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_replaces_whole_record() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let mut doc = Document::new("user-1", "Draft");
        repo.put(&doc).await.unwrap();

        doc.title = "Final".to_string();
        doc.content = "done".to_string();
        doc.current_version = 4;
        doc.lifecycle = Lifecycle::Deleted;
        repo.put(&doc).await.unwrap();

        let fetched = repo.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_owner_orders_and_filters() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let older = document_at("user-1", "Older", 100);
        let newer = document_at("user-1", "Newer", 200);
        let mut deleted = document_at("user-1", "Deleted", 300);
        deleted.lifecycle = Lifecycle::Deleted;
        let foreign = document_at("user-2", "Foreign", 400);
        for doc in [&older, &newer, &deleted, &foreign] {
            repo.put(doc).await.unwrap();
        }

        let titles = repo
            .list_by_owner("user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_in_folder_separates_root() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let folder_id = FolderId::new();
        let root_doc = Document::new("user-1", "Root");
        let mut nested = Document::new("user-1", "Nested");
        nested.folder_id = Some(folder_id);
        repo.put(&root_doc).await.unwrap();
        repo.put(&nested).await.unwrap();

        let in_root = repo.list_in_folder("user-1", None).await.unwrap();
        assert_eq!(in_root.len(), 1);
        assert_eq!(in_root[0].id, root_doc.id);

        let in_folder = repo
            .list_in_folder("user-1", Some(&folder_id))
            .await
            .unwrap();
        assert_eq!(in_folder.len(), 1);
        assert_eq!(in_folder[0].id, nested.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ids_by_prefix() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let mut a = Document::new("user-1", "A");
        a.id = "11111111-1111-7111-8111-111111111111".parse().unwrap();
        let mut b = Document::new("user-1", "B");
        b.id = "11111111-1111-7111-8111-222222222222".parse().unwrap();
        repo.put(&a).await.unwrap();
        repo.put(&b).await.unwrap();

        let both = repo
            .list_ids_by_prefix("user-1", "11111111", 10)
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let one = repo
            .list_ids_by_prefix("user-1", "11111111-1111-7111-8111-2", 10)
            .await
            .unwrap();
        assert_eq!(one, vec![b.id.to_string()]);

        for pattern in ["%", "_", "1111111_"] {
            let none = repo.list_ids_by_prefix("user-1", pattern, 10).await.unwrap();
            assert!(none.is_empty(), "{pattern} matched {none:?}");
        }
    }
}
