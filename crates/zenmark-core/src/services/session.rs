//! One user's replica on one device.

use crate::config::SessionConfig;
use crate::remote::{RemoteStore, RestRemoteStore};
use crate::sync::{ReconcileScheduler, Reconciler};
use crate::{Error, Result};

use super::{DocumentManager, FolderManager, LocalStore, VersionLedger};

/// Explicitly constructed bundle of the local store, its managers and the
/// reconciler for one user.
///
/// The reconciler is absent when no remote store is configured; every local
/// operation still works.
pub struct Session<R = RestRemoteStore> {
    config: SessionConfig,
    documents: DocumentManager,
    versions: VersionLedger,
    folders: FolderManager,
    reconciler: Option<Reconciler<R>>,
}

impl Session<RestRemoteStore> {
    /// Open the configured local replica and, when configured, the HTTP
    /// remote store.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let remote = config
            .remote
            .as_ref()
            .map(RestRemoteStore::new)
            .transpose()?;
        if remote.is_none() {
            tracing::info!("Running in local-only mode (no remote store configured)");
        }
        Self::open_with_remote(config, remote).await
    }
}

impl<R: RemoteStore> Session<R> {
    /// Open a session with a caller-supplied remote store.
    pub async fn open_with_remote(config: SessionConfig, remote: Option<R>) -> Result<Self> {
        config.validate()?;
        let store = match &config.db_path {
            Some(path) => LocalStore::open_path(path).await?,
            None => LocalStore::open_in_memory().await?,
        };

        let reconciler = remote.map(|remote| {
            Reconciler::new(store.clone(), remote)
                .with_request_timeout(config.reconcile.request_timeout())
        });

        Ok(Self {
            documents: DocumentManager::new(store.clone(), config.device_id.clone()),
            versions: VersionLedger::new(store.clone(), config.device_id.clone()),
            folders: FolderManager::new(store.clone()),
            reconciler,
            config,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub const fn documents(&self) -> &DocumentManager {
        &self.documents
    }

    pub const fn versions(&self) -> &VersionLedger {
        &self.versions
    }

    pub const fn folders(&self) -> &FolderManager {
        &self.folders
    }

    /// The reconciler, or an error in local-only mode.
    pub fn reconciler(&self) -> Result<&Reconciler<R>> {
        self.reconciler.as_ref().ok_or_else(|| {
            Error::InvalidInput(
                "no remote store configured; set a remote URL and API key".to_string(),
            )
        })
    }

    pub const fn is_local_only(&self) -> bool {
        self.reconciler.is_none()
    }
}

impl<R: RemoteStore + Clone> Session<R> {
    /// A scheduler running passes for this session's user at the configured
    /// interval.
    pub fn scheduler(&self) -> Result<ReconcileScheduler<R>> {
        let reconciler = self.reconciler()?.clone();
        Ok(ReconcileScheduler::new(
            reconciler,
            self.config.user_id.clone(),
            self.config.reconcile.interval(),
        ))
    }
}
