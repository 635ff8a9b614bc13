use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use pretty_assertions::assert_eq;
use zenmark_core::models::DocumentPatch;
use zenmark_core::remote::InMemoryRemoteStore;
use zenmark_core::sync::ReconcileOutcome;
use zenmark_core::Session;

use crate::cli::CompletionShell;
use crate::commands::common::{
    build_session_config, default_editor, format_relative_time, format_timestamp,
    load_session_config, normalize_identifier, normalize_search_query, resolve_document,
    resolve_folder_target, truncate, CliContext, DEFAULT_DEVICE_ID, DEFAULT_USER_ID,
    ENV_ACCESS_TOKEN, ENV_API_KEY, ENV_REMOTE_URL, ENV_USER_ID,
};
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::move_doc::run_move;
use crate::commands::sync::format_report_lines;
use crate::commands::versions::format_history_lines;
use crate::config_profiles::CliProfile;
use crate::error::CliError;

#[test]
fn normalize_identifier_rejects_empty() {
    assert_eq!(normalize_identifier("  abc ").unwrap(), "abc");
    assert!(matches!(normalize_identifier(" \t "), Err(CliError::EmptyId)));
}

#[test]
fn normalize_search_query_rejects_empty() {
    assert_eq!(normalize_search_query(" rust ").unwrap(), "rust");
    assert!(matches!(
        normalize_search_query("   "),
        Err(CliError::EmptySearchQuery)
    ));
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_buckets() {
    let now = 1_700_000_000_000;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(now - 400 * 86_400_000, now), "1y ago");
}

#[test]
fn format_timestamp_handles_never_synced() {
    assert_eq!(format_timestamp(0), "never");
    assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
}

#[test]
fn truncate_collapses_whitespace_and_shortens() {
    assert_eq!(truncate("  a   b  ", 10), "a b");
    assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
}

#[test]
fn session_config_defaults_to_local_only() {
    let config =
        build_session_config(&PathBuf::from("/tmp/z.db"), &CliProfile::default(), |_| None)
            .unwrap();

    assert_eq!(config.user_id, DEFAULT_USER_ID);
    assert_eq!(config.device_id, DEFAULT_DEVICE_ID);
    assert_eq!(config.db_path, Some(PathBuf::from("/tmp/z.db")));
    assert!(config.remote.is_none());
}

#[test]
fn session_config_env_overrides_profile() {
    let profile = CliProfile {
        user_id: Some("alice".to_string()),
        device_id: Some("laptop".to_string()),
        remote_url: Some("https://profile.example.co".to_string()),
        api_key: Some("profile-key".to_string()),
        sync_interval_secs: Some(90),
    };
    let config = build_session_config(&PathBuf::from("z.db"), &profile, |key| match key {
        ENV_USER_ID => Some("bob".to_string()),
        ENV_REMOTE_URL => Some("https://env.example.co".to_string()),
        ENV_ACCESS_TOKEN => Some("jwt".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.user_id, "bob");
    assert_eq!(config.device_id, "laptop");
    assert_eq!(config.reconcile.interval_secs, 90);
    let remote = config.remote.unwrap();
    assert_eq!(remote.url, "https://env.example.co");
    assert_eq!(remote.api_key, "profile-key");
    assert_eq!(remote.access_token.as_deref(), Some("jwt"));
}

#[test]
fn session_config_rejects_half_configured_remote() {
    let result = build_session_config(&PathBuf::from("z.db"), &CliProfile::default(), |key| {
        (key == ENV_API_KEY).then(|| "key".to_string())
    });
    assert!(matches!(result, Err(CliError::Core(_))));
}

#[test]
fn history_lines_mark_current_version() {
    let history = vec![
        zenmark_core::models::VersionSnapshot::new(
            zenmark_core::DocumentId::new(),
            2,
            "second draft",
            "laptop",
        ),
        zenmark_core::models::VersionSnapshot::new(
            zenmark_core::DocumentId::new(),
            1,
            "",
            "laptop",
        ),
    ];

    let lines = format_history_lines(&history, 2);
    assert!(lines[0].starts_with("* v2"));
    assert!(lines[0].ends_with("second draft"));
    assert!(lines[1].starts_with("  v1"));
    assert!(lines[1].ends_with("(empty)"));
}

#[test]
fn completions_write_to_output_file() {
    let path = unique_test_path("bash");
    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert!(script.contains("zenmark"));
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn resolve_document_accepts_unique_prefix() {
    let db_path = unique_test_path("db");
    let context = test_context(&db_path);
    let session = Session::open(load_session_config(&context).unwrap())
        .await
        .unwrap();

    let document = session
        .documents()
        .create(session.user_id(), "Prefix me")
        .await
        .unwrap();
    let full_id = document.id.to_string();

    let resolved = resolve_document(&full_id[..30], &session).await.unwrap();
    assert_eq!(resolved.id, document.id);

    let missing = resolve_document("ffffffff", &session).await;
    assert!(matches!(missing, Err(CliError::DocumentNotFound(_))));

    drop(session);
    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn resolve_document_reports_ambiguous_prefix() {
    let db_path = unique_test_path("db");
    let context = test_context(&db_path);
    let session = Session::open(load_session_config(&context).unwrap())
        .await
        .unwrap();

    let first = session
        .documents()
        .create(session.user_id(), "One")
        .await
        .unwrap();
    session
        .documents()
        .create(session.user_id(), "Two")
        .await
        .unwrap();

    // UUIDv7 ids created back to back share their timestamp prefix
    let prefix = first.id.to_string()[..6].to_string();
    let result = resolve_document(&prefix, &session).await;
    assert!(matches!(result, Err(CliError::AmbiguousId(_))));

    drop(session);
    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn resolve_folder_target_treats_root_as_none() {
    let db_path = unique_test_path("db");
    let context = test_context(&db_path);
    let session = Session::open(load_session_config(&context).unwrap())
        .await
        .unwrap();

    assert_eq!(resolve_folder_target(None, &session).await.unwrap(), None);
    assert_eq!(
        resolve_folder_target(Some("root"), &session).await.unwrap(),
        None
    );

    let folder = session
        .folders()
        .create(session.user_id(), "Work", None)
        .await
        .unwrap();
    assert_eq!(
        resolve_folder_target(Some(&folder.id.to_string()), &session)
            .await
            .unwrap(),
        Some(folder.id)
    );

    drop(session);
    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn delete_command_soft_deletes_document() {
    let db_path = unique_test_path("db");
    let context = test_context(&db_path);
    let id = {
        let session = Session::open(load_session_config(&context).unwrap())
            .await
            .unwrap();
        let document = session
            .documents()
            .create(session.user_id(), "Doomed")
            .await
            .unwrap();
        document.id
    };

    run_delete(&id.to_string(), &context).await.unwrap();

    let session = Session::open(load_session_config(&context).unwrap())
        .await
        .unwrap();
    let stored = session.documents().get(&id).await.unwrap().unwrap();
    assert!(!stored.is_active());
    assert!(session
        .documents()
        .list(session.user_id())
        .await
        .unwrap()
        .is_empty());

    drop(session);
    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn move_command_files_document_into_folder() {
    let db_path = unique_test_path("db");
    let context = test_context(&db_path);
    let (document_id, folder_id) = {
        let session = Session::open(load_session_config(&context).unwrap())
            .await
            .unwrap();
        let document = session
            .documents()
            .create(session.user_id(), "Plan")
            .await
            .unwrap();
        let folder = session
            .folders()
            .create(session.user_id(), "Projects", None)
            .await
            .unwrap();
        (document.id, folder.id)
    };

    run_move(
        &document_id.to_string(),
        Some(&folder_id.to_string()),
        &context,
    )
    .await
    .unwrap();

    let session = Session::open(load_session_config(&context).unwrap())
        .await
        .unwrap();
    let stored = session.documents().get(&document_id).await.unwrap().unwrap();
    assert_eq!(stored.folder_id, Some(folder_id));

    drop(session);
    cleanup_db_files(&db_path);
}

#[tokio::test(flavor = "current_thread")]
#[cfg_attr(windows, ignore)]
async fn report_lines_for_offline_and_completed_passes() {
    let remote = InMemoryRemoteStore::new();
    let config = build_session_config(&unique_test_path("db"), &CliProfile::default(), |_| None)
        .unwrap();
    let config = zenmark_core::config::SessionConfig {
        db_path: None,
        ..config
    };
    let session = Session::open_with_remote(config, Some(remote.clone()))
        .await
        .unwrap();
    let document = session
        .documents()
        .create(session.user_id(), "Synced")
        .await
        .unwrap();
    session
        .documents()
        .update(&document.id, DocumentPatch::default().content("# Synced"))
        .await
        .unwrap();

    remote.set_online(false);
    let offline = session
        .reconciler()
        .unwrap()
        .reconcile_all(session.user_id())
        .await
        .unwrap();
    assert_eq!(offline.outcome, ReconcileOutcome::Offline);
    assert_eq!(
        format_report_lines(&offline),
        vec!["remote store unreachable, nothing synced".to_string()]
    );

    remote.set_online(true);
    let report = session
        .reconciler()
        .unwrap()
        .reconcile_all(session.user_id())
        .await
        .unwrap();
    let lines = format_report_lines(&report);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("pushed 1, pulled 0, conflicts 0, failures 0"));
}

fn test_context(db_path: &PathBuf) -> CliContext {
    CliContext {
        db_path: db_path.clone(),
        profile: Some(format!("zenmark-test-{}", std::process::id())),
    }
}

fn unique_test_path(extension: &str) -> PathBuf {
    static NEXT_TEST_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("zenmark-cli-test-{timestamp}-{sequence}.{extension}"))
}

fn cleanup_db_files(path: &PathBuf) {
    // libsql can keep file handles alive briefly after drop on Windows.
    if cfg!(windows) {
        return;
    }

    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
}
