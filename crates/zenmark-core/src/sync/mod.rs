//! Reconciliation engine.
//!
//! A pass pushes every `pending` document, then pulls the remote collection
//! and adopts strictly newer copies. Conflicts are detected by comparing
//! last-modified timestamps only; ties go to the local copy.
//!
//! The local store lock is never held across a remote call.

mod report;
mod scheduler;

pub use report::{DocumentFailure, ReconcileOutcome, ReconcileReport, SyncPhase};
pub use scheduler::{ReconcileScheduler, SchedulerHandle};

use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::db::{
    DocumentRepository, LibSqlDocumentRepository, LibSqlSyncStateRepository, SyncStateRepository,
};
use crate::models::{Document, DocumentId, SyncState, SyncStatus};
use crate::remote::{RemoteDocument, RemoteError, RemoteResult, RemoteStore};
use crate::services::{adopt_document, LocalStore};
use crate::util::{next_modified, now_millis};
use crate::{Error, Result};

/// Result of pushing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushOutcome {
    /// The remote copy now holds the local document
    Pushed,
    /// The remote copy was newer; the document is now in conflict
    Conflict,
}

/// Which copy wins when resolving a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveStrategy {
    TakeRemote,
    TakeLocal,
}

impl FromStr for ResolveStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "takeremote" | "take-remote" => Ok(Self::TakeRemote),
            "local" | "takelocal" | "take-local" => Ok(Self::TakeLocal),
            other => Err(Error::InvalidInput(format!(
                "unknown resolve strategy '{other}' (expected remote or local)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullOutcome {
    Adopted,
    Conflict,
    Unchanged,
}

/// Drives reconciliation between the local replica and a remote store.
#[derive(Clone)]
pub struct Reconciler<R> {
    store: LocalStore,
    remote: R,
    request_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<R: RemoteStore> Reconciler<R> {
    pub fn new(store: LocalStore, remote: R) -> Self {
        Self {
            store,
            remote,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Bound every remote call by `timeout`.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run one full push-then-pull pass for `user_id`.
    ///
    /// Per-document transport failures are collected in the report. Only a
    /// local store failure or a failure to list the remote collection is
    /// returned as an error.
    pub async fn reconcile_all(&self, user_id: &str) -> Result<ReconcileReport> {
        let started = Instant::now();
        let Some(_guard) = self.try_begin(user_id) else {
            tracing::debug!("Reconcile for {} already in flight, skipping", user_id);
            return Ok(ReconcileReport::new(user_id, ReconcileOutcome::Skipped));
        };

        let reachable = tokio::time::timeout(self.request_timeout, self.remote.is_reachable())
            .await
            .unwrap_or(false);
        if !reachable {
            tracing::info!("Remote store unreachable, skipping reconcile for {}", user_id);
            return Ok(ReconcileReport::new(user_id, ReconcileOutcome::Offline));
        }

        let mut report = ReconcileReport::new(user_id, ReconcileOutcome::Completed);

        let pending = {
            let db = self.store.lock().await;
            LibSqlSyncStateRepository::new(db.connection())
                .list_by_status(user_id, SyncStatus::Pending)
                .await?
        };
        for state in pending {
            let id = state.document_id;
            match self.push_one(&id, user_id).await {
                Ok(PushOutcome::Pushed) => report.pushed.push(id),
                Ok(PushOutcome::Conflict) => report.conflicts.push(id),
                // Flagged by a concurrent pull or resolution since the listing
                Err(Error::UnresolvedConflict(_)) => {}
                Err(error) if error.is_transport() => {
                    report.fail(id.to_string(), SyncPhase::Push, &error);
                }
                Err(error) => return Err(error),
            }
        }

        let remote_documents = self.call(self.remote.query_by_owner(user_id)).await?;
        for remote in remote_documents {
            let raw_id = remote.id.clone();
            match self.pull_one(remote, user_id).await {
                Ok((id, PullOutcome::Adopted)) => report.pulled.push(id),
                Ok((id, PullOutcome::Conflict)) => report.conflicts.push(id),
                Ok((_, PullOutcome::Unchanged)) => {}
                Err(error) if error.is_transport() => {
                    report.fail(raw_id, SyncPhase::Pull, &error);
                }
                Err(error) => return Err(error),
            }
        }

        report.duration = started.elapsed();
        tracing::info!("Reconciled {}: {}", user_id, report.summary());
        Ok(report)
    }

    /// Push one document to the remote store unless the remote copy is newer.
    pub async fn push_one(&self, id: &DocumentId, user_id: &str) -> Result<PushOutcome> {
        let (document, state) = {
            let db = self.store.lock().await;
            let conn = db.connection();
            let document = load_owned(conn, id, user_id).await?;
            let state = LibSqlSyncStateRepository::new(conn)
                .get(id)
                .await?
                .unwrap_or_else(|| SyncState::pending(*id));
            (document, state)
        };
        if state.status == SyncStatus::Conflict {
            return Err(Error::UnresolvedConflict(id.to_string()));
        }

        let remote = self.call(self.remote.get_one(id)).await?;
        if let Some(remote) = remote.filter(|remote| remote.updated_at > document.updated_at) {
            tracing::warn!(
                "Conflict on document {}: remote modified at {}, local at {}",
                id,
                remote.updated_at,
                document.updated_at
            );
            let db = self.store.lock().await;
            LibSqlSyncStateRepository::new(db.connection())
                .put(&SyncState {
                    status: SyncStatus::Conflict,
                    ..state
                })
                .await?;
            return Ok(PushOutcome::Conflict);
        }

        self.call(self.remote.upsert(&RemoteDocument::from(&document)))
            .await?;
        self.mark_synced_if_unchanged(&document).await?;
        tracing::debug!("Pushed document {}", id);
        Ok(PushOutcome::Pushed)
    }

    /// Settle a document explicitly, whatever its current status.
    pub async fn resolve(
        &self,
        id: &DocumentId,
        strategy: ResolveStrategy,
        user_id: &str,
    ) -> Result<Document> {
        let resolved = match strategy {
            ResolveStrategy::TakeRemote => self.take_remote(id, user_id).await?,
            ResolveStrategy::TakeLocal => self.take_local(id, user_id).await?,
        };
        tracing::info!("Resolved document {} with {:?}", id, strategy);
        Ok(resolved)
    }

    /// Current sync status of a local document.
    pub async fn status(&self, id: &DocumentId) -> Result<SyncStatus> {
        let db = self.store.lock().await;
        let conn = db.connection();
        if LibSqlDocumentRepository::new(conn).get(id).await?.is_none() {
            return Err(Error::NotFound(format!("document {id}")));
        }
        Ok(LibSqlSyncStateRepository::new(conn)
            .get(id)
            .await?
            .map_or(SyncStatus::Pending, |state| state.status))
    }

    async fn take_remote(&self, id: &DocumentId, user_id: &str) -> Result<Document> {
        {
            let db = self.store.lock().await;
            load_owned(db.connection(), id, user_id).await?;
        }
        let remote = self
            .call(self.remote.get_one(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("remote copy of document {id}")))?;
        let incoming = Document::try_from(remote)?;

        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<Document> = async {
            let conn = db.connection();
            let adopted = adopt_document(conn, incoming).await?;
            LibSqlSyncStateRepository::new(conn)
                .put(&SyncState::synced(*id, now_millis()))
                .await?;
            Ok(adopted)
        }
        .await;
        db.finish(result).await
    }

    async fn take_local(&self, id: &DocumentId, user_id: &str) -> Result<Document> {
        {
            let db = self.store.lock().await;
            load_owned(db.connection(), id, user_id).await?;
        }
        let remote = self.call(self.remote.get_one(id)).await?;

        // The winning copy must also win the next pull on every other device.
        let document = {
            let db = self.store.lock().await;
            let conn = db.connection();
            let mut document = load_owned(conn, id, user_id).await?;
            let floor = remote.map_or(0, |remote| remote.updated_at.saturating_add(1));
            document.updated_at = next_modified(document.updated_at).max(floor);
            LibSqlDocumentRepository::new(conn).put(&document).await?;
            document
        };

        self.call(self.remote.upsert(&RemoteDocument::from(&document)))
            .await?;
        if !self.mark_synced_if_unchanged(&document).await? {
            return Err(Error::ChangedDuringResolve(id.to_string()));
        }
        Ok(document)
    }

    async fn pull_one(
        &self,
        remote: RemoteDocument,
        user_id: &str,
    ) -> Result<(DocumentId, PullOutcome)> {
        let incoming = Document::try_from(remote)?;
        let id = incoming.id;
        if incoming.owner_id != user_id {
            return Err(RemoteError::InvalidPayload(format!(
                "document {id} belongs to another user"
            ))
            .into());
        }

        let db = self.store.lock().await;
        db.begin().await?;
        let result: Result<PullOutcome> = async {
            let conn = db.connection();
            let local = LibSqlDocumentRepository::new(conn).get(&id).await?;
            let local_modified = local.as_ref().map_or(0, |document| document.updated_at);
            if incoming.updated_at <= local_modified {
                return Ok(PullOutcome::Unchanged);
            }

            let states = LibSqlSyncStateRepository::new(conn);
            match states.get(&id).await? {
                Some(state) if state.status == SyncStatus::Conflict => {
                    tracing::debug!("Leaving conflicted document {} untouched", id);
                    Ok(PullOutcome::Unchanged)
                }
                Some(state) if local.is_some() && state.status == SyncStatus::Pending => {
                    tracing::warn!("Document {} changed on both replicas", id);
                    states
                        .put(&SyncState {
                            status: SyncStatus::Conflict,
                            ..state
                        })
                        .await?;
                    Ok(PullOutcome::Conflict)
                }
                _ => {
                    adopt_document(conn, incoming).await?;
                    states.put(&SyncState::synced(id, now_millis())).await?;
                    tracing::debug!("Pulled document {}", id);
                    Ok(PullOutcome::Adopted)
                }
            }
        }
        .await;
        Ok((id, db.finish(result).await?))
    }

    /// Mark `pushed` synced unless it was edited locally while in flight.
    ///
    /// Returns whether the state was settled.
    async fn mark_synced_if_unchanged(&self, pushed: &Document) -> Result<bool> {
        let db = self.store.lock().await;
        let conn = db.connection();
        let current = LibSqlDocumentRepository::new(conn).get(&pushed.id).await?;
        if current.is_some_and(|current| current.updated_at == pushed.updated_at) {
            LibSqlSyncStateRepository::new(conn)
                .put(&SyncState::synced(pushed.id, now_millis()))
                .await?;
            Ok(true)
        } else {
            tracing::debug!("Document {} changed during push, leaving it unsettled", pushed.id);
            Ok(false)
        }
    }

    async fn call<T>(&self, request: impl Future<Output = RemoteResult<T>>) -> Result<T> {
        let response = tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| RemoteError::Timeout(self.request_timeout))?;
        Ok(response?)
    }

    pub(crate) fn try_begin(&self, user_id: &str) -> Option<InFlightGuard> {
        let mut users = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        users.insert(user_id.to_string()).then(|| InFlightGuard {
            users: Arc::clone(&self.in_flight),
            user_id: user_id.to_string(),
        })
    }
}

/// Marks a user's pass as running until dropped.
pub(crate) struct InFlightGuard {
    users: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

async fn load_owned(
    conn: &libsql::Connection,
    id: &DocumentId,
    user_id: &str,
) -> Result<Document> {
    LibSqlDocumentRepository::new(conn)
        .get(id)
        .await?
        .filter(|document| document.owner_id == user_id)
        .ok_or_else(|| Error::NotFound(format!("document {id}")))
}
