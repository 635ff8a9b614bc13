use crate::commands::common::{normalize_identifier, open_session, resolve_document, CliContext};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    if !session.documents().delete(&document.id).await? {
        return Err(CliError::DocumentNotFound(normalized_id));
    }
    println!("{}", document.id);
    Ok(())
}
