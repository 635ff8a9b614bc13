use crate::commands::common::{
    format_document_lines, normalize_search_query, open_session, summary_to_list_item,
    CliContext, DocumentListItem,
};
use crate::error::CliError;

pub async fn run_search(
    query: &str,
    limit: usize,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let query = normalize_search_query(query)?;
    let session = open_session(context).await?;
    let mut summaries = session
        .documents()
        .search(session.user_id(), &query)
        .await?;
    summaries.truncate(limit);

    if as_json {
        let json_items = summaries
            .iter()
            .map(summary_to_list_item)
            .collect::<Vec<DocumentListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_document_lines(&summaries) {
            println!("{line}");
        }
    }

    Ok(())
}
