pub mod add;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod folder;
pub mod list;
pub mod move_doc;
pub mod search;
pub mod show;
pub mod sync;
pub mod versions;
