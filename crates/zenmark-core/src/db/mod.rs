//! Local replica store on libSQL

mod connection;
mod document_repository;
mod folder_repository;
mod migrations;
mod sync_state_repository;
mod version_repository;

pub use connection::Database;
pub use document_repository::{DocumentRepository, LibSqlDocumentRepository};
pub use folder_repository::{FolderRepository, LibSqlFolderRepository};
pub use sync_state_repository::{LibSqlSyncStateRepository, SyncStateRepository};
pub use version_repository::{LibSqlVersionRepository, VersionRepository};

use std::str::FromStr;

use libsql::{Row, Value};

use crate::error::{Error, Result};

/// Read a nullable TEXT column.
fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Database(format!(
            "expected TEXT or NULL in column {idx}, found {other:?}"
        ))),
    }
}

/// Bind an optional string as TEXT or NULL.
fn nullable_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

/// Parse an identifier column into its typed id.
fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid {kind} id '{raw}'")))
}
