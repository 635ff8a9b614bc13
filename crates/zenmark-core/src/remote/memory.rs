//! In-process remote store with fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{RemoteDocument, RemoteError, RemoteResult, RemoteStore};
use crate::models::DocumentId;

#[derive(Debug, Default)]
struct State {
    documents: HashMap<String, RemoteDocument>,
    offline: bool,
    failing: HashSet<String>,
    fail_listing: bool,
    upserts: usize,
}

/// Remote store kept in memory.
///
/// Clones share state, so a test can keep a handle while the reconciler owns
/// another one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a document directly, as another device would have.
    pub fn insert(&self, document: RemoteDocument) {
        self.state()
            .documents
            .insert(document.id.clone(), document);
    }

    pub fn get(&self, id: &DocumentId) -> Option<RemoteDocument> {
        self.state().documents.get(&id.as_str()).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggle connectivity; while offline every call fails with `Unreachable`.
    pub fn set_online(&self, online: bool) {
        self.state().offline = !online;
    }

    /// Make every read and write of `id` fail with a server error.
    pub fn fail_document(&self, id: &DocumentId) {
        self.state().failing.insert(id.as_str());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state().fail_listing = fail;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failing.clear();
        state.fail_listing = false;
    }

    /// Number of successful `upsert` calls so far.
    pub fn upsert_count(&self) -> usize {
        self.state().upserts
    }

    fn check(state: &State, id: &str) -> RemoteResult<()> {
        if state.offline {
            return Err(RemoteError::Unreachable);
        }
        if state.failing.contains(id) {
            return Err(RemoteError::Api {
                status: 503,
                message: format!("injected failure for {id}"),
            });
        }
        Ok(())
    }
}

impl RemoteStore for InMemoryRemoteStore {
    async fn is_reachable(&self) -> bool {
        !self.state().offline
    }

    async fn get_one(&self, id: &DocumentId) -> RemoteResult<Option<RemoteDocument>> {
        let state = self.state();
        let key = id.as_str();
        Self::check(&state, &key)?;
        Ok(state.documents.get(&key).cloned())
    }

    async fn upsert(&self, document: &RemoteDocument) -> RemoteResult<()> {
        let mut state = self.state();
        Self::check(&state, &document.id)?;
        state
            .documents
            .insert(document.id.clone(), document.clone());
        state.upserts += 1;
        Ok(())
    }

    async fn query_by_owner(&self, owner_id: &str) -> RemoteResult<Vec<RemoteDocument>> {
        let state = self.state();
        if state.offline {
            return Err(RemoteError::Unreachable);
        }
        if state.fail_listing {
            return Err(RemoteError::Api {
                status: 500,
                message: "injected listing failure".to_string(),
            });
        }
        let mut documents = state
            .documents
            .values()
            .filter(|document| document.user_id == owner_id)
            .cloned()
            .collect::<Vec<_>>();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_query() {
        let remote = InMemoryRemoteStore::new();
        let mine = Document::new("user-1", "Mine");
        let theirs = Document::new("user-2", "Theirs");
        remote.upsert(&(&mine).into()).await.unwrap();
        remote.upsert(&(&theirs).into()).await.unwrap();

        assert_eq!(remote.upsert_count(), 2);
        let listed = remote.query_by_owner("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id.as_str());
        assert!(remote.get_one(&DocumentId::new()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_and_injected_failures() {
        let remote = InMemoryRemoteStore::new();
        let doc = Document::new("user-1", "Doc");

        remote.fail_document(&doc.id);
        assert!(matches!(
            remote.get_one(&doc.id).await,
            Err(RemoteError::Api { status: 503, .. })
        ));

        remote.clear_failures();
        remote.set_online(false);
        assert!(!remote.is_reachable().await);
        assert!(matches!(
            remote.upsert(&(&doc).into()).await,
            Err(RemoteError::Unreachable)
        ));
        assert_eq!(remote.upsert_count(), 0);
    }
}
