use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "zenmark")]
#[command(about = "Offline-first markdown notes that sync when you are back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name holding identity and remote settings
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Quick create: zenmark "Document title"
    #[arg(trailing_var_arg = true)]
    pub title: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new document
    #[command(alias = "add")]
    New {
        /// Document title
        title: Vec<String>,
        /// Folder ID or unique ID prefix to create the document in
        #[arg(long, value_name = "FOLDER")]
        folder: Option<String>,
    },
    /// List documents, most recently modified first
    List {
        /// Number of documents to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only documents directly inside this folder ("root" for top level)
        #[arg(long, value_name = "FOLDER")]
        folder: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search titles and content
    Search {
        /// Search query
        query: String,
        /// Number of documents to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a document
    Show {
        /// Document ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a document's content in $EDITOR, or its title with --title
    Edit {
        /// Document ID or unique ID prefix
        id: String,
        /// New title instead of opening the editor
        #[arg(long)]
        title: Option<String>,
    },
    /// Replace the tags of a document
    Tag {
        /// Document ID or unique ID prefix
        id: String,
        /// Tags, with or without a leading '#'; none clears all tags
        tags: Vec<String>,
    },
    /// Delete a document
    Delete {
        /// Document ID or unique ID prefix
        id: String,
    },
    /// Move a document into a folder
    Move {
        /// Document ID or unique ID prefix
        id: String,
        /// Target folder ID or prefix; omit to move to the top level
        #[arg(long, value_name = "FOLDER")]
        to: Option<String>,
    },
    /// Snapshot the current content as a new version
    Checkpoint {
        /// Document ID or unique ID prefix
        id: String,
    },
    /// Show the version history of a document
    History {
        /// Document ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore an earlier version as a new version
    Rollback {
        /// Document ID or unique ID prefix
        id: String,
        /// Version number to restore
        version: i64,
    },
    /// Manage folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Reconcile the local replica with the remote store
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ResolveSide {
    /// Keep the remote copy
    Remote,
    /// Keep the local copy and overwrite the remote one
    Local,
}

#[derive(Subcommand)]
pub enum FolderCommands {
    /// Create a folder
    Create {
        /// Folder name
        name: String,
        /// Parent folder ID or prefix
        #[arg(long, value_name = "FOLDER")]
        parent: Option<String>,
    },
    /// List folders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a folder
    Rename {
        /// Folder ID or unique ID prefix
        id: String,
        /// New name
        name: String,
    },
    /// Delete a folder; its contents move up one level
    Delete {
        /// Folder ID or unique ID prefix
        id: String,
    },
    /// Move a folder under another one
    Move {
        /// Folder ID or unique ID prefix
        id: String,
        /// Target folder ID or prefix; omit to move to the top level
        #[arg(long, value_name = "FOLDER")]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Run one reconciliation pass now (default)
    Now {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync status of one document or all documents
    Status {
        /// Document ID or unique ID prefix
        id: Option<String>,
    },
    /// Resolve a conflicted document
    Resolve {
        /// Document ID or unique ID prefix
        id: String,
        /// Which copy wins
        #[arg(long, value_enum)]
        take: ResolveSide,
    },
    /// Keep syncing on an interval until interrupted
    Watch {
        /// Seconds between passes (defaults to the profile or 30)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// User identifier documents are owned by
        #[arg(long, value_name = "ID")]
        user_id: Option<String>,
        /// Name recorded on version snapshots written from this machine
        #[arg(long, value_name = "NAME")]
        device_id: Option<String>,
        /// Remote store base URL
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// Remote store public API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Seconds between passes for `sync watch`
        #[arg(long, value_name = "SECS")]
        sync_interval: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}
