//! zenmark-core - Replica reconciliation core for ZenMark
//!
//! This crate keeps a local replica of a user's markdown documents usable
//! offline and reconciles it with a remote replica when connectivity returns.
//! It contains the data models, the libSQL-backed local store, the version
//! ledger, the document and folder managers, and the reconciliation engine.
//! Presentation and identity live in the clients (see `zenmark-cli`).

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Document, DocumentId};
pub use services::Session;
