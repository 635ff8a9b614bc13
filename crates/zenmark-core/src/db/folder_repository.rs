//! Folder repository implementation

use libsql::{params, Connection, Row, Value};

use super::{nullable_text, optional_text, parse_id};
use crate::error::Result;
use crate::models::{Folder, FolderId};

const FOLDER_COLUMNS: &str = "id, owner_id, name, parent_id, created_at, updated_at, lifecycle";

/// Trait for folder storage operations (async)
#[allow(async_fn_in_trait)]
pub trait FolderRepository {
    /// Get a folder by ID, including soft-deleted ones
    async fn get(&self, id: &FolderId) -> Result<Option<Folder>>;

    /// Insert or replace the whole folder record
    async fn put(&self, folder: &Folder) -> Result<()>;

    /// List an owner's active folders by name
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Folder>>;

    /// Active folders directly under `parent` (`None` = root)
    async fn list_children(&self, owner_id: &str, parent: Option<&FolderId>)
        -> Result<Vec<Folder>>;

    /// IDs of an owner's active folders starting with `prefix`
    async fn list_ids_by_prefix(
        &self,
        owner_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>>;
}

/// libSQL implementation of `FolderRepository`
pub struct LibSqlFolderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlFolderRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_folder(row: &Row) -> Result<Folder> {
        let id: String = row.get(0)?;
        let parent_id = optional_text(row, 3)?
            .map(|raw| parse_id::<FolderId>(&raw, "folder"))
            .transpose()?;
        let lifecycle: String = row.get(6)?;

        Ok(Folder {
            id: parse_id(&id, "folder")?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            parent_id,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            lifecycle: lifecycle.parse()?,
        })
    }

    async fn collect(&self, mut rows: libsql::Rows) -> Result<Vec<Folder>> {
        let mut folders = Vec::new();
        while let Some(row) = rows.next().await? {
            folders.push(Self::parse_folder(&row)?);
        }
        Ok(folders)
    }
}

impl FolderRepository for LibSqlFolderRepository<'_> {
    async fn get(&self, id: &FolderId) -> Result<Option<Folder>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_folder(&row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, folder: &Folder) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO folders (id, owner_id, name, parent_id, created_at, updated_at, lifecycle)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    name = excluded.name,
                    parent_id = excluded.parent_id,
                    updated_at = excluded.updated_at,
                    lifecycle = excluded.lifecycle",
                params![
                    folder.id.as_str(),
                    folder.owner_id.as_str(),
                    folder.name.as_str(),
                    nullable_text(folder.parent_id.map(|id| id.as_str())),
                    folder.created_at,
                    folder.updated_at,
                    folder.lifecycle.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Folder>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {FOLDER_COLUMNS}
                     FROM folders
                     WHERE owner_id = ? AND lifecycle = 'active'
                     ORDER BY name COLLATE NOCASE ASC"
                ),
                [owner_id],
            )
            .await?;
        self.collect(rows).await
    }

    async fn list_children(
        &self,
        owner_id: &str,
        parent: Option<&FolderId>,
    ) -> Result<Vec<Folder>> {
        let rows = match parent {
            Some(parent_id) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {FOLDER_COLUMNS}
                             FROM folders
                             WHERE owner_id = ? AND parent_id = ? AND lifecycle = 'active'
                             ORDER BY name COLLATE NOCASE ASC"
                        ),
                        params![owner_id, parent_id.as_str()],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {FOLDER_COLUMNS}
                             FROM folders
                             WHERE owner_id = ? AND parent_id IS NULL AND lifecycle = 'active'
                             ORDER BY name COLLATE NOCASE ASC"
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
                "SELECT id FROM folders
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
    use crate::models::Lifecycle;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlFolderRepository::new(db.connection());

        let folder = Folder::new("user-1", "Work", None).unwrap();
        repo.put(&folder).await.unwrap();

        assert_eq!(repo.get(&folder.id).await.unwrap(), Some(folder));
        assert!(repo.get(&FolderId::new()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_owner_skips_deleted() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlFolderRepository::new(db.connection());

        let work = Folder::new("user-1", "work", None).unwrap();
        let archive = Folder::new("user-1", "Archive", None).unwrap();
        let mut gone = Folder::new("user-1", "Gone", None).unwrap();
        gone.lifecycle = Lifecycle::Deleted;
        let foreign = Folder::new("user-2", "Theirs", None).unwrap();
        for folder in [&work, &archive, &gone, &foreign] {
            repo.put(folder).await.unwrap();
        }

        let names = repo
            .list_by_owner("user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|folder| folder.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Archive", "work"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_children() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlFolderRepository::new(db.connection());

        let parent = Folder::new("user-1", "Parent", None).unwrap();
        let child = Folder::new("user-1", "Child", Some(parent.id)).unwrap();
        repo.put(&parent).await.unwrap();
        repo.put(&child).await.unwrap();

        let roots = repo.list_children("user-1", None).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, parent.id);

        let children = repo.list_children("user-1", Some(&parent.id)).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prefix_is_matched_literally() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlFolderRepository::new(db.connection());

        let folder = Folder::new("user-1", "Inbox", None).unwrap();
        repo.put(&folder).await.unwrap();
        let id = folder.id.to_string();

        let found = repo.list_ids_by_prefix("user-1", &id[..8], 3).await.unwrap();
        assert_eq!(found, vec![id.clone()]);
        assert!(repo.list_ids_by_prefix("user-1", "%", 3).await.unwrap().is_empty());
        assert!(repo
            .list_ids_by_prefix("user-1", &format!("{}_", &id[..7]), 3)
            .await
            .unwrap()
            .is_empty());
    }
}
