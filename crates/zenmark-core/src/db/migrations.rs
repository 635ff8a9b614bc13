//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Execute `statements` in one transaction
async fn apply(conn: &Connection, statements: &[&str]) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

/// Migration to version 1: documents, version ledger and sync state
async fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            // Schema version tracking
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                current_version INTEGER NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                lifecycle TEXT NOT NULL DEFAULT 'active'
            )",
            "CREATE INDEX IF NOT EXISTS idx_documents_owner_updated
                ON documents(owner_id, updated_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_documents_lifecycle ON documents(lifecycle)",
            // Version ledger
            "CREATE TABLE IF NOT EXISTS doc_versions (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                version_number INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                device_id TEXT NOT NULL,
                UNIQUE (document_id, version_number)
            )",
            "CREATE INDEX IF NOT EXISTS idx_doc_versions_document
                ON doc_versions(document_id, version_number DESC)",
            // Snapshots are append-only
            "CREATE TRIGGER IF NOT EXISTS doc_versions_immutable BEFORE UPDATE ON doc_versions
             BEGIN
                 SELECT RAISE(ABORT, 'version snapshots are immutable');
             END",
            // Per-document sync metadata
            "CREATE TABLE IF NOT EXISTS sync_state (
                document_id TEXT PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
                status TEXT NOT NULL,
                last_synced_at INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_state_status ON sync_state(status)",
            // Record migration version
            "INSERT INTO schema_version (version) VALUES (1)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: folder tree
async fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            "CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT REFERENCES folders(id),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                lifecycle TEXT NOT NULL DEFAULT 'active'
            )",
            "CREATE INDEX IF NOT EXISTS idx_folders_owner ON folders(owner_id, name)",
            "CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_id)",
            // Documents pulled from the remote store may reference folders that
            // only exist on another device, so this is not a foreign key.
            "ALTER TABLE documents ADD COLUMN folder_id TEXT",
            "CREATE INDEX IF NOT EXISTS idx_documents_folder ON documents(folder_id)",
            "INSERT INTO schema_version (version) VALUES (2)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_create_all_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in ["documents", "doc_versions", "sync_state", "folders"] {
            assert!(table_exists(&conn, table).await, "missing table {table}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_snapshot_rows_cannot_be_updated() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        conn.execute(
            "INSERT INTO documents (id, owner_id, title, content, created_at, updated_at, current_version)
             VALUES ('d1', 'u1', 't', '', 1, 1, 1)",
            (),
        )
        .await
        .unwrap();
        conn.execute(
            "INSERT INTO doc_versions (id, document_id, version_number, content, created_at, device_id)
             VALUES ('v1', 'd1', 1, '', 1, 'test')",
            (),
        )
        .await
        .unwrap();

        let result = conn
            .execute("UPDATE doc_versions SET content = 'rewritten' WHERE id = 'v1'", ())
            .await;
        assert!(result.is_err());
    }
}
