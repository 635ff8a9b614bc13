use std::collections::{HashMap, HashSet};

use zenmark_core::models::{Folder, FolderId};

use crate::cli::FolderCommands;
use crate::commands::common::{
    normalize_identifier, open_session, resolve_folder, resolve_folder_target, short_id,
    CliContext,
};
use crate::error::CliError;

pub async fn run_folder(command: FolderCommands, context: &CliContext) -> Result<(), CliError> {
    let session = open_session(context).await?;
    let folders = session.folders();

    match command {
        FolderCommands::Create { name, parent } => {
            let parent = resolve_folder_target(parent.as_deref(), &session).await?;
            let folder = folders.create(session.user_id(), &name, parent).await?;
            println!("{}", folder.id);
        }
        FolderCommands::List { json } => {
            let all = folders.list(session.user_id()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                println!("No folders.");
            } else {
                for line in format_folder_tree(&all) {
                    println!("{line}");
                }
            }
        }
        FolderCommands::Rename { id, name } => {
            let folder = resolve_folder(&normalize_identifier(&id)?, &session).await?;
            let renamed = folders.rename(&folder.id, &name).await?;
            println!("{}  {}", renamed.id, renamed.name);
        }
        FolderCommands::Delete { id } => {
            let normalized_id = normalize_identifier(&id)?;
            let folder = resolve_folder(&normalized_id, &session).await?;
            if !folders.delete(&folder.id).await? {
                return Err(CliError::FolderNotFound(normalized_id));
            }
            println!("{}", folder.id);
        }
        FolderCommands::Move { id, to } => {
            let folder = resolve_folder(&normalize_identifier(&id)?, &session).await?;
            let target = resolve_folder_target(to.as_deref(), &session).await?;
            let moved = folders.move_to(&folder.id, target).await?;
            match moved.parent_id {
                Some(parent_id) => println!("{} -> {parent_id}", moved.id),
                None => println!("{} -> root", moved.id),
            }
        }
    }

    Ok(())
}

/// Indented tree lines, siblings in the order given.
///
/// Folders whose parent is not in `folders` are shown at the top level.
pub fn format_folder_tree(folders: &[Folder]) -> Vec<String> {
    let known: HashSet<FolderId> = folders.iter().map(|folder| folder.id).collect();
    let mut children: HashMap<Option<FolderId>, Vec<&Folder>> = HashMap::new();
    for folder in folders {
        let parent = folder.parent_id.filter(|parent| known.contains(parent));
        children.entry(parent).or_default().push(folder);
    }

    let mut lines = Vec::with_capacity(folders.len());
    let mut stack: Vec<(&Folder, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|folder| (*folder, 0)).collect())
        .unwrap_or_default();
    let mut visited = HashSet::new();

    while let Some((folder, depth)) = stack.pop() {
        if !visited.insert(folder.id) {
            continue;
        }
        let indent = "  ".repeat(depth);
        lines.push(format!(
            "{:<13}  {indent}{}/",
            short_id(&folder.id.to_string()),
            folder.name
        ));
        if let Some(nested) = children.get(&Some(folder.id)) {
            stack.extend(nested.iter().rev().map(|child| (*child, depth + 1)));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn folder(name: &str, parent: Option<FolderId>) -> Folder {
        Folder::new("user-1", name, parent).unwrap()
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let work = folder("Work", None);
        let reports = folder("Reports", Some(work.id));
        let home = folder("Home", None);

        let lines = format_folder_tree(&[home.clone(), reports.clone(), work.clone()]);
        let names = lines
            .iter()
            .map(|line| line[15..].to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["Home/", "Work/", "  Reports/"]);
    }

    #[test]
    fn orphaned_folders_show_at_top_level() {
        let orphan = folder("Orphan", Some(FolderId::new()));
        let lines = format_folder_tree(&[orphan]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("  Orphan/"));
    }
}
