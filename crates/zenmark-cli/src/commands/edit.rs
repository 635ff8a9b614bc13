use zenmark_core::models::{normalize_tags, DocumentPatch};

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_identifier, open_session, render_tags,
    resolve_document, CliContext,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    context: &CliContext,
) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    let patch = if let Some(title) = title {
        DocumentPatch::default().title(title)
    } else {
        let edited = capture_editor_input_with_initial(&document.content)?;
        if edited == document.content {
            println!("No changes for {}", document.id);
            return Ok(());
        }
        DocumentPatch::default().content(edited)
    };

    let updated = session
        .documents()
        .update(&document.id, patch)
        .await?
        .ok_or_else(|| CliError::DocumentNotFound(normalized_id.clone()))?;

    println!("{}", updated.id);
    Ok(())
}

pub async fn run_tag(id: &str, tags: &[String], context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let tags = normalize_tags(tags)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    let updated = session
        .documents()
        .update(&document.id, DocumentPatch::default().tags(tags))
        .await?
        .ok_or_else(|| CliError::DocumentNotFound(normalized_id.clone()))?;

    let rendered = render_tags(&updated);
    if rendered.is_empty() {
        println!("{}  (no tags)", updated.id);
    } else {
        println!("{}  {rendered}", updated.id);
    }
    Ok(())
}
