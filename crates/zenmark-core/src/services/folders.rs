//! Folder tree of the local replica.
//!
//! Invariants:
//! - Folder names are trimmed and never blank.
//! - A move never makes a folder its own ancestor.
//! - Deleting a folder dissolves it: direct children move up to its parent.

use std::collections::HashSet;

use libsql::Connection;

use super::documents::touch;
use super::LocalStore;
use crate::db::{
    DocumentRepository, FolderRepository, LibSqlDocumentRepository, LibSqlFolderRepository,
};
use crate::models::{normalize_folder_name, Folder, FolderId, Lifecycle};
use crate::util::next_modified;
use crate::{Error, Result};

#[derive(Clone)]
pub struct FolderManager {
    store: LocalStore,
}

impl FolderManager {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Create a folder under `parent` (`None` = root).
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        parent: Option<FolderId>,
    ) -> Result<Folder> {
        let folder = Folder::new(user_id, name, parent)?;
        let db = self.store.lock().await;
        let conn = db.connection();
        if let Some(parent_id) = parent {
            active_folder(conn, &parent_id, Some(user_id)).await?;
        }
        LibSqlFolderRepository::new(conn).put(&folder).await?;
        Ok(folder)
    }

    /// Active folders of `user_id` by name.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Folder>> {
        let db = self.store.lock().await;
        LibSqlFolderRepository::new(db.connection())
            .list_by_owner(user_id)
            .await
    }

    pub async fn get(&self, id: &FolderId) -> Result<Option<Folder>> {
        let db = self.store.lock().await;
        LibSqlFolderRepository::new(db.connection()).get(id).await
    }

    /// IDs of active folders starting with `prefix`.
    pub async fn find_ids_by_prefix(
        &self,
        user_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let db = self.store.lock().await;
        LibSqlFolderRepository::new(db.connection())
            .list_ids_by_prefix(user_id, prefix, limit)
            .await
    }

    pub async fn rename(&self, id: &FolderId, name: &str) -> Result<Folder> {
        let name = normalize_folder_name(name.to_string())?;
        let db = self.store.lock().await;
        let conn = db.connection();
        let mut folder = active_folder(conn, id, None).await?;
        folder.name = name;
        folder.updated_at = next_modified(folder.updated_at);
        LibSqlFolderRepository::new(conn).put(&folder).await?;
        Ok(folder)
    }

    /// Soft-delete a folder, moving its direct child folders and documents
    /// to its parent. Returns `false` when there was nothing to delete.
    pub async fn delete(&self, id: &FolderId) -> Result<bool> {
        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<bool> = async {
            let conn = db.connection();
            let folders = LibSqlFolderRepository::new(conn);
            let Some(mut folder) = folders.get(id).await?.filter(Folder::is_active) else {
                return Ok(false);
            };

            for mut child in folders.list_children(&folder.owner_id, Some(id)).await? {
                child.parent_id = folder.parent_id;
                child.updated_at = next_modified(child.updated_at);
                folders.put(&child).await?;
            }

            let documents = LibSqlDocumentRepository::new(conn)
                .list_in_folder(&folder.owner_id, Some(id))
                .await?;
            let moved = documents.len();
            for mut document in documents {
                document.folder_id = folder.parent_id;
                touch(conn, &mut document).await?;
            }

            folder.lifecycle = Lifecycle::Deleted;
            folder.updated_at = next_modified(folder.updated_at);
            folders.put(&folder).await?;
            tracing::debug!("Deleted folder {}, moved {} documents up", id, moved);
            Ok(true)
        }
        .await;
        db.finish(result).await
    }

    /// Reparent a folder; `None` moves it to the root.
    pub async fn move_to(&self, id: &FolderId, target: Option<FolderId>) -> Result<Folder> {
        let db = self.store.lock().await;
        let conn = db.connection();
        let mut folder = active_folder(conn, id, None).await?;

        if let Some(target_id) = target {
            active_folder(conn, &target_id, Some(&folder.owner_id)).await?;
            if would_create_cycle(conn, id, target_id).await? {
                return Err(Error::CycleDetected {
                    folder: id.to_string(),
                    target: target_id.to_string(),
                });
            }
        }

        folder.parent_id = target;
        folder.updated_at = next_modified(folder.updated_at);
        LibSqlFolderRepository::new(conn).put(&folder).await?;
        Ok(folder)
    }
}

async fn active_folder(conn: &Connection, id: &FolderId, owner: Option<&str>) -> Result<Folder> {
    LibSqlFolderRepository::new(conn)
        .get(id)
        .await?
        .filter(|folder| folder.is_active() && owner.is_none_or(|owner| folder.owner_id == owner))
        .ok_or_else(|| Error::NotFound(format!("folder {id}")))
}

/// Walk up from `candidate_parent` to the root looking for `folder`.
async fn would_create_cycle(
    conn: &Connection,
    folder: &FolderId,
    candidate_parent: FolderId,
) -> Result<bool> {
    let folders = LibSqlFolderRepository::new(conn);
    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent);
    while let Some(current) = cursor {
        if current == *folder {
            return Ok(true);
        }
        if !visited.insert(current) {
            return Ok(true);
        }

        let node = folders
            .get(&current)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {current}")))?;
        cursor = node.parent_id;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::DocumentManager;
    use pretty_assertions::assert_eq;

    async fn setup() -> (LocalStore, FolderManager) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let folders = FolderManager::new(store.clone());
        (store, folders)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_list_by_name() {
        let (_, folders) = setup().await;
        folders.create("user-1", "zeta", None).await.unwrap();
        let alpha = folders.create("user-1", " Alpha ", None).await.unwrap();
        folders
            .create("user-1", "Nested", Some(alpha.id))
            .await
            .unwrap();

        let names = folders
            .list("user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|folder| folder.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Alpha", "Nested", "zeta"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_rejects_blank_and_unknown_parent() {
        let (_, folders) = setup().await;
        assert!(matches!(
            folders.create("user-1", "   ", None).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            folders.create("user-1", "Child", Some(FolderId::new())).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rename() {
        let (_, folders) = setup().await;
        let folder = folders.create("user-1", "Old", None).await.unwrap();
        let renamed = folders.rename(&folder.id, "  New ").await.unwrap();
        assert_eq!(renamed.name, "New");
        assert!(renamed.updated_at > folder.updated_at);
        assert!(folders.rename(&folder.id, "").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_move_into_itself_is_cycle() {
        let (_, folders) = setup().await;
        let folder = folders.create("user-1", "Loop", None).await.unwrap();
        assert!(matches!(
            folders.move_to(&folder.id, Some(folder.id)).await,
            Err(Error::CycleDetected { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_move_into_descendant_is_cycle() {
        let (_, folders) = setup().await;
        let top = folders.create("user-1", "Top", None).await.unwrap();
        let middle = folders.create("user-1", "Middle", Some(top.id)).await.unwrap();
        let bottom = folders
            .create("user-1", "Bottom", Some(middle.id))
            .await
            .unwrap();

        assert!(matches!(
            folders.move_to(&top.id, Some(bottom.id)).await,
            Err(Error::CycleDetected { .. })
        ));

        let moved = folders.move_to(&bottom.id, None).await.unwrap();
        assert_eq!(moved.parent_id, None);
        let moved = folders.move_to(&top.id, Some(bottom.id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(bottom.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_dissolves_into_parent() {
        let (store, folders) = setup().await;
        let documents = DocumentManager::new(store.clone(), "laptop");
        let parent = folders.create("user-1", "Parent", None).await.unwrap();
        let doomed = folders
            .create("user-1", "Doomed", Some(parent.id))
            .await
            .unwrap();
        let child = folders
            .create("user-1", "Child", Some(doomed.id))
            .await
            .unwrap();
        let doc = documents.create("user-1", "Inside").await.unwrap();
        documents.move_to(&doc.id, Some(doomed.id)).await.unwrap();

        assert!(folders.delete(&doomed.id).await.unwrap());
        assert!(!folders.delete(&doomed.id).await.unwrap());

        let child = folders.get(&child.id).await.unwrap().unwrap();
        assert_eq!(child.parent_id, Some(parent.id));
        let doc = documents.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(doc.folder_id, Some(parent.id));
        assert!(folders
            .list("user-1")
            .await
            .unwrap()
            .iter()
            .all(|folder| folder.id != doomed.id));
    }
}
