use crate::commands::common::{
    format_document_lines, open_session, resolve_folder_target, summary_to_list_item,
    CliContext, DocumentListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    folder: Option<&str>,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let session = open_session(context).await?;
    let mut summaries = session.documents().list(session.user_id()).await?;

    if folder.is_some() {
        let target = resolve_folder_target(folder, &session).await?;
        summaries.retain(|summary| summary.document.folder_id == target);
    }
    summaries.truncate(limit);

    if as_json {
        let json_items = summaries
            .iter()
            .map(summary_to_list_item)
            .collect::<Vec<DocumentListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if summaries.is_empty() {
        println!("No documents.");
    } else {
        for line in format_document_lines(&summaries) {
            println!("{line}");
        }
    }

    Ok(())
}
