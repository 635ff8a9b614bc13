use crate::commands::common::{
    normalize_identifier, open_session, resolve_document, resolve_folder_target, CliContext,
};
use crate::error::CliError;

pub async fn run_move(id: &str, to: Option<&str>, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;
    let target = resolve_folder_target(to, &session).await?;

    let moved = session.documents().move_to(&document.id, target).await?;
    match moved.folder_id {
        Some(folder_id) => println!("{} -> {folder_id}", moved.id),
        None => println!("{} -> root", moved.id),
    }
    Ok(())
}
