use zenmark_core::models::VersionSnapshot;

use crate::commands::common::{
    format_timestamp, normalize_identifier, open_session, resolve_document, truncate, CliContext,
};
use crate::error::CliError;

pub async fn run_checkpoint(id: &str, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    let snapshot = session.versions().checkpoint(&document.id).await?;
    println!("{}  v{}", document.id, snapshot.version_number);
    Ok(())
}

pub async fn run_history(id: &str, as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;
    let history = session.versions().history(&document.id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    for line in format_history_lines(&history, document.current_version) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_rollback(id: &str, version: i64, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    let target = session
        .versions()
        .history(&document.id)
        .await?
        .into_iter()
        .find(|snapshot| snapshot.version_number == version)
        .ok_or(CliError::VersionNotFound(version))?;

    session
        .versions()
        .rollback_to(&document.id, &target.id)
        .await?;
    println!(
        "{}  restored v{} as v{}",
        document.id,
        version,
        document.current_version + 1
    );
    Ok(())
}

pub fn format_history_lines(history: &[VersionSnapshot], current_version: i64) -> Vec<String> {
    history
        .iter()
        .map(|snapshot| {
            let marker = if snapshot.version_number == current_version {
                "*"
            } else {
                " "
            };
            let label = format!("v{}", snapshot.version_number);
            let preview = snapshot
                .content
                .lines()
                .find(|line| !line.trim().is_empty())
                .map_or_else(|| "(empty)".to_string(), |line| truncate(line, 40));
            format!(
                "{marker} {label:<5}  {}  {:<12}  {preview}",
                format_timestamp(snapshot.created_at),
                snapshot.device_id
            )
        })
        .collect()
}
