use crate::commands::common::{
    format_timestamp, normalize_identifier, open_session, render_tags, resolve_document,
    CliContext,
};
use crate::error::CliError;

pub async fn run_show(id: &str, as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let normalized_id = normalize_identifier(id)?;
    let session = open_session(context).await?;
    let document = resolve_document(&normalized_id, &session).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("# {}", document.title);
    println!(
        "id: {}  version: v{}  updated: {}",
        document.id,
        document.current_version,
        format_timestamp(document.updated_at)
    );
    let tags = render_tags(&document);
    if !tags.is_empty() {
        println!("tags: {tags}");
    }
    println!();
    print!("{}", document.content);
    if !document.content.is_empty() && !document.content.ends_with('\n') {
        println!();
    }
    Ok(())
}
