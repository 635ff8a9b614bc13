use chrono::Utc;
use zenmark_core::models::SyncStatus;
use zenmark_core::sync::{ReconcileOutcome, ReconcileReport, ResolveStrategy};
use zenmark_core::{DocumentId, Session};

use crate::cli::{ResolveSide, SyncCommands};
use crate::commands::common::{
    format_document_lines, format_timestamp, load_session_config, normalize_identifier,
    open_session, open_syncing_session, resolve_document, short_id, CliContext,
};
use crate::error::CliError;

pub async fn run_sync(command: Option<SyncCommands>, context: &CliContext) -> Result<(), CliError> {
    match command.unwrap_or(SyncCommands::Now { json: false }) {
        SyncCommands::Now { json } => run_sync_now(json, context).await,
        SyncCommands::Status { id } => run_sync_status(id.as_deref(), context).await,
        SyncCommands::Resolve { id, take } => run_sync_resolve(&id, take, context).await,
        SyncCommands::Watch { interval } => run_sync_watch(interval, context).await,
    }
}

pub async fn run_sync_now(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let session = open_syncing_session(context).await?;
    let report = session
        .reconciler()?
        .reconcile_all(session.user_id())
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_sync_status(id: Option<&str>, context: &CliContext) -> Result<(), CliError> {
    let session = open_session(context).await?;

    if let Some(id) = id {
        let normalized_id = normalize_identifier(id)?;
        let document = resolve_document(&normalized_id, &session).await?;
        let status = document_status(&session, &document.id).await?;
        println!("{}  {status}", document.id);
        return Ok(());
    }

    let summaries = session.documents().list(session.user_id()).await?;
    let count = |status: SyncStatus| {
        summaries
            .iter()
            .filter(|summary| summary.status == status)
            .count()
    };
    let mode = if session.is_local_only() {
        "local only (no remote configured)"
    } else {
        "remote configured"
    };
    println!("Mode: {mode}");
    println!(
        "Documents: {} synced, {} pending, {} in conflict",
        count(SyncStatus::Synced),
        count(SyncStatus::Pending),
        count(SyncStatus::Conflict)
    );

    let unsettled = summaries
        .into_iter()
        .filter(|summary| summary.status != SyncStatus::Synced)
        .collect::<Vec<_>>();
    for line in format_document_lines(&unsettled) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_sync_resolve(
    id: &str,
    take: ResolveSide,
    context: &CliContext,
) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_syncing_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    let strategy = match take {
        ResolveSide::Remote => ResolveStrategy::TakeRemote,
        ResolveSide::Local => ResolveStrategy::TakeLocal,
    };
    let resolved = session
        .reconciler()?
        .resolve(&document.id, strategy, session.user_id())
        .await?;

    let side = match take {
        ResolveSide::Remote => "remote",
        ResolveSide::Local => "local",
    };
    println!(
        "{}  kept {side} copy (v{})",
        resolved.id, resolved.current_version
    );
    Ok(())
}

/// Run scheduled passes until Ctrl-C.
pub async fn run_sync_watch(interval: Option<u64>, context: &CliContext) -> Result<(), CliError> {
    let mut config = load_session_config(context)?;
    if let Some(secs) = interval {
        if secs == 0 {
            return Err(CliError::Config(
                "sync interval must be at least one second".to_string(),
            ));
        }
        config.reconcile.interval_secs = secs;
    }
    let interval_secs = config.reconcile.interval_secs;

    let session = Session::open(config).await?;
    if session.is_local_only() {
        return Err(CliError::SyncNotConfigured);
    }
    let scheduler = session.scheduler()?;
    let handle = scheduler.handle();

    println!(
        "Syncing {} every {interval_secs}s. Press Ctrl-C to stop.",
        session.user_id()
    );

    let stop = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupted, stopping sync"),
            Err(error) => tracing::warn!("Failed to listen for Ctrl-C: {}", error),
        }
        handle.shutdown();
    };
    let run = scheduler.run(|report| {
        let now = format_timestamp(Utc::now().timestamp_millis());
        println!("[{now}] {}", report.summary());
        for line in format_report_lines(report).into_iter().skip(1) {
            println!("  {line}");
        }
    });
    tokio::join!(run, stop);

    Ok(())
}

async fn document_status(
    session: &Session,
    id: &DocumentId,
) -> Result<SyncStatus, CliError> {
    let summaries = session.documents().list(session.user_id()).await?;
    Ok(summaries
        .into_iter()
        .find(|summary| summary.document.id == *id)
        .map_or(SyncStatus::Pending, |summary| summary.status))
}

/// First line is the summary; conflicts and failures follow one per line.
pub fn format_report_lines(report: &ReconcileReport) -> Vec<String> {
    let mut lines = vec![report.summary()];
    if report.outcome != ReconcileOutcome::Completed {
        return lines;
    }

    for id in &report.conflicts {
        lines.push(format!(
            "conflict  {}  resolve with `zenmark sync resolve {} --take remote|local`",
            short_id(&id.to_string()),
            short_id(&id.to_string())
        ));
    }
    for failure in &report.failures {
        lines.push(format!(
            "failed    {}  {}: {}",
            short_id(&failure.document_id),
            failure.phase,
            failure.message
        ));
    }
    lines
}
