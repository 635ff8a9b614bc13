use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use zenmark_core::config::{RemoteConfig, ReconcileConfig, SessionConfig, ENV_SYNC_INTERVAL_SECS};
use zenmark_core::models::{Folder, FolderId};
use zenmark_core::services::DocumentSummary;
use zenmark_core::util::normalize_text_option;
use zenmark_core::{Document, DocumentId, Session};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const ENV_DB_PATH: &str = "ZENMARK_DB_PATH";
pub const ENV_USER_ID: &str = "ZENMARK_USER_ID";
pub const ENV_DEVICE_ID: &str = "ZENMARK_DEVICE_ID";
pub const ENV_REMOTE_URL: &str = "ZENMARK_REMOTE_URL";
pub const ENV_API_KEY: &str = "ZENMARK_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "ZENMARK_ACCESS_TOKEN";

pub const DEFAULT_USER_ID: &str = "local";
pub const DEFAULT_DEVICE_ID: &str = "cli";

const SHORT_ID_LEN: usize = 13;

/// Global flags every command needs to open the replica.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub profile: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub folder_id: Option<String>,
    pub status: String,
    pub current_version: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub tags: Vec<String>,
}

pub async fn open_session(context: &CliContext) -> Result<Session, CliError> {
    let config = load_session_config(context)?;
    Ok(Session::open(config).await?)
}

/// Fail early with a pointer to `config init` when no remote is configured.
pub async fn open_syncing_session(context: &CliContext) -> Result<Session, CliError> {
    let session = open_session(context).await?;
    if session.is_local_only() {
        return Err(CliError::SyncNotConfigured);
    }
    Ok(session)
}

pub fn load_session_config(context: &CliContext) -> Result<SessionConfig, CliError> {
    let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = profiles.resolve_profile_name(context.profile.as_deref());
    let profile = profiles.profile(&profile_name).cloned().unwrap_or_default();
    build_session_config(&context.db_path, &profile, |key| env::var(key).ok())
}

/// Environment variables override the profile; missing identity falls back
/// to single-user defaults.
pub fn build_session_config(
    db_path: &Path,
    profile: &CliProfile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SessionConfig, CliError> {
    let from_env = |key: &str| normalize_text_option(lookup(key));

    let user_id = from_env(ENV_USER_ID)
        .or_else(|| profile.user_id.clone())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    let device_id = from_env(ENV_DEVICE_ID)
        .or_else(|| profile.device_id.clone())
        .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string());

    let mut reconcile = ReconcileConfig::from_env()?;
    if from_env(ENV_SYNC_INTERVAL_SECS).is_none() {
        if let Some(secs) = profile.sync_interval_secs {
            reconcile.interval_secs = secs;
        }
    }

    let remote = RemoteConfig::resolve(
        from_env(ENV_REMOTE_URL).or_else(|| profile.remote_url.clone()),
        from_env(ENV_API_KEY).or_else(|| profile.api_key.clone()),
        from_env(ENV_ACCESS_TOKEN),
    )?
    .map(|mut remote| {
        remote.request_timeout_secs = reconcile.request_timeout_secs;
        remote
    });

    Ok(SessionConfig::new(user_id, device_id)
        .with_db_path(db_path)
        .with_remote(remote)
        .with_reconcile(reconcile))
}

pub fn generate_device_id() -> String {
    let id = Uuid::now_v7().simple().to_string();
    format!("cli-{}", &id[id.len() - 8..])
}

pub async fn resolve_document(query: &str, session: &Session) -> Result<Document, CliError> {
    let user_id = session.user_id();
    if let Ok(id) = query.parse::<DocumentId>() {
        if let Some(document) = session.documents().get(&id).await? {
            if document.is_active() && document.owner_id == user_id {
                return Ok(document);
            }
        }
    }

    let matching_ids = session
        .documents()
        .find_ids_by_prefix(user_id, query, 3)
        .await?;
    let id = single_match(query, &matching_ids)?
        .ok_or_else(|| CliError::DocumentNotFound(query.to_string()))?
        .parse::<DocumentId>()
        .map_err(|_| CliError::DocumentNotFound(query.to_string()))?;

    session
        .documents()
        .get(&id)
        .await?
        .ok_or_else(|| CliError::DocumentNotFound(query.to_string()))
}

pub async fn resolve_folder(query: &str, session: &Session) -> Result<Folder, CliError> {
    let user_id = session.user_id();
    if let Ok(id) = query.parse::<FolderId>() {
        if let Some(folder) = session.folders().get(&id).await? {
            if folder.is_active() && folder.owner_id == user_id {
                return Ok(folder);
            }
        }
    }

    let matching_ids = session
        .folders()
        .find_ids_by_prefix(user_id, query, 3)
        .await?;
    let id = single_match(query, &matching_ids)?
        .ok_or_else(|| CliError::FolderNotFound(query.to_string()))?
        .parse::<FolderId>()
        .map_err(|_| CliError::FolderNotFound(query.to_string()))?;

    session
        .folders()
        .get(&id)
        .await?
        .ok_or_else(|| CliError::FolderNotFound(query.to_string()))
}

/// `None` and `"root"` both mean the top level.
pub async fn resolve_folder_target(
    query: Option<&str>,
    session: &Session,
) -> Result<Option<FolderId>, CliError> {
    match query.map(str::trim) {
        None | Some("" | "root" | "/") => Ok(None),
        Some(query) => Ok(Some(resolve_folder(query, session).await?.id)),
    }
}

fn single_match<'a>(query: &str, matching_ids: &'a [String]) -> Result<Option<&'a str>, CliError> {
    match matching_ids {
        [] => Ok(None),
        [only] => Ok(Some(only.as_str())),
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_document_lines(summaries: &[DocumentSummary]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    summaries
        .iter()
        .map(|summary| {
            let document = &summary.document;
            let id = short_id(&document.id.to_string());
            let title = truncate(&document.title, 40);
            let relative_time = format_relative_time(document.updated_at, now_ms);
            let status = summary.status.as_str();
            let tags = render_tags(document);

            if tags.is_empty() {
                format!("{id:<13}  {title:<40}  {status:<8}  {relative_time}")
            } else {
                format!("{id:<13}  {title:<40}  {status:<8}  {relative_time:<10}  {tags}")
            }
        })
        .collect()
}

pub fn summary_to_list_item(summary: &DocumentSummary) -> DocumentListItem {
    let now_ms = Utc::now().timestamp_millis();
    let document = &summary.document;

    DocumentListItem {
        id: document.id.to_string(),
        title: document.title.clone(),
        preview: document.preview(80),
        folder_id: document.folder_id.map(|id| id.to_string()),
        status: summary.status.to_string(),
        current_version: document.current_version,
        created_at: document.created_at,
        updated_at: document.updated_at,
        relative_time: format_relative_time(document.updated_at, now_ms),
        tags: document.tags.iter().cloned().collect(),
    }
}

pub fn render_tags(document: &Document) -> String {
    document
        .tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    if timestamp_ms <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Content piped on stdin, if any. Whitespace-only input counts as none.
pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(buffer))
    }
}

/// Open `initial_content` in the user's editor and return what was saved.
///
/// Markdown is kept verbatim; an empty document is a valid result.
pub fn capture_editor_input_with_initial(initial_content: &str) -> Result<String, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_document_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(content)
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        // EDITOR may carry arguments, e.g. "code --wait"
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_document_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("zenmark-doc-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zenmark")
        .join("zenmark.db")
}
