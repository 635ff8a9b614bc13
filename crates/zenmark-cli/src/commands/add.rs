use zenmark_core::models::DocumentPatch;

use crate::commands::common::{open_session, read_piped_stdin, resolve_folder_target, CliContext};
use crate::error::CliError;

/// Create a document titled by `title_parts`; piped stdin becomes its content.
pub async fn run_add(
    title_parts: &[String],
    folder: Option<&str>,
    context: &CliContext,
) -> Result<(), CliError> {
    let session = open_session(context).await?;
    let target = resolve_folder_target(folder, &session).await?;
    let content = read_piped_stdin()?;

    let title = title_parts.join(" ");
    let mut document = session
        .documents()
        .create(session.user_id(), &title)
        .await?;

    if let Some(content) = content {
        if let Some(updated) = session
            .documents()
            .update(&document.id, DocumentPatch::default().content(content))
            .await?
        {
            document = updated;
        }
    }
    if target.is_some() {
        document = session.documents().move_to(&document.id, target).await?;
    }

    println!("{}", document.id);
    Ok(())
}
