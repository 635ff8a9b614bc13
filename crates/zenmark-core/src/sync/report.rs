//! Outcome of one reconciliation pass.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::models::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// Push and pull phases ran (individual documents may still have failed)
    Completed,
    /// The remote store was not reachable; nothing was attempted
    Offline,
    /// Another pass for the same user was already running
    Skipped,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Offline => "offline",
            Self::Skipped => "skipped",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Push,
    Pull,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Push => "push",
            Self::Pull => "pull",
        })
    }
}

/// A document that could not be reconciled during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    /// Raw identifier; remote payloads may carry ids we cannot parse
    pub document_id: String,
    pub phase: SyncPhase,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub user_id: String,
    pub outcome: ReconcileOutcome,
    pub pushed: Vec<DocumentId>,
    pub pulled: Vec<DocumentId>,
    pub conflicts: Vec<DocumentId>,
    pub failures: Vec<DocumentFailure>,
    pub duration: Duration,
}

impl ReconcileReport {
    pub(crate) fn new(user_id: &str, outcome: ReconcileOutcome) -> Self {
        Self {
            user_id: user_id.to_string(),
            outcome,
            pushed: Vec::new(),
            pulled: Vec::new(),
            conflicts: Vec::new(),
            failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn fail(&mut self, document_id: impl Into<String>, phase: SyncPhase, error: &crate::Error) {
        let document_id = document_id.into();
        tracing::warn!("{} of document {} failed: {}", phase, document_id, error);
        self.failures.push(DocumentFailure {
            document_id,
            phase,
            message: error.to_string(),
        });
    }

    pub const fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.failures.is_empty()
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        match self.outcome {
            ReconcileOutcome::Completed => format!(
                "pushed {}, pulled {}, conflicts {}, failures {} in {}ms",
                self.pushed.len(),
                self.pulled.len(),
                self.conflicts.len(),
                self.failures.len(),
                self.duration.as_millis()
            ),
            ReconcileOutcome::Offline => "remote store unreachable, nothing synced".to_string(),
            ReconcileOutcome::Skipped => "another sync is already running".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_documents() {
        let mut report = ReconcileReport::new("user-1", ReconcileOutcome::Completed);
        report.pushed.push(DocumentId::new());
        report.fail("abc", SyncPhase::Pull, &crate::Error::NotFound("x".to_string()));

        assert!(!report.is_clean());
        assert!(report.summary().starts_with("pushed 1, pulled 0, conflicts 0, failures 1"));
        assert_eq!(report.failures[0].phase, SyncPhase::Pull);
    }

    #[test]
    fn offline_summary() {
        let report = ReconcileReport::new("user-1", ReconcileOutcome::Offline);
        assert!(report.is_clean());
        assert_eq!(report.summary(), "remote store unreachable, nothing synced");
    }
}
