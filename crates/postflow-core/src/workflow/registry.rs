//! In-memory registry of approval rounds waiting for a human decision
//!
//! Each entry owns the sending half of a oneshot channel. Removing the entry
//! from the map is the linearization point: whoever removes it (a callback or
//! the timeout) is the only party that can complete the round. A handle that
//! is dropped before a decision arrives expires its own entry, so a cancelled
//! waiter never leaves an orphan behind.

use crate::error::{PostflowError, Result};
use super::approval_types::{ApprovalDecision, ApprovalMetadata, WorkflowId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

struct PendingApproval {
    completion: oneshot::Sender<ApprovalDecision>,
    created_at: DateTime<Utc>,
    metadata: ApprovalMetadata,
}

/// Read-only view of a pending round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub workflow_id: WorkflowId,
    pub created_at: DateTime<Utc>,
    pub metadata: ApprovalMetadata,
}

/// Concurrency-safe map from workflow id to its waiter
#[derive(Default)]
pub struct PendingApprovalRegistry {
    entries: Mutex<HashMap<WorkflowId, PendingApproval>>,
}

impl PendingApprovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<WorkflowId, PendingApproval>> {
        // The map stays consistent even if a holder panicked: every critical
        // section is a single insert or remove.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new pending round and return the handle its orchestrator waits on
    pub fn register(self: &Arc<Self>, workflow_id: WorkflowId, metadata: ApprovalMetadata) -> Result<WaitHandle> {
        let (completion, receiver) = oneshot::channel();

        let mut entries = self.entries();
        if entries.contains_key(&workflow_id) {
            return Err(PostflowError::DuplicateWorkflowId(workflow_id.to_string()));
        }

        log::debug!("Registering approval {} (attempt {})", workflow_id, metadata.attempt);
        entries.insert(
            workflow_id.clone(),
            PendingApproval {
                completion,
                created_at: Utc::now(),
                metadata,
            },
        );

        Ok(WaitHandle {
            workflow_id,
            receiver,
            registry: Arc::clone(self),
        })
    }

    /// Remove the entry and complete it with `decision`.
    /// Returns false, without touching the map, when the id is unknown.
    pub fn resolve(&self, workflow_id: &WorkflowId, decision: ApprovalDecision) -> bool {
        let entry = self.entries().remove(workflow_id);

        match entry {
            Some(pending) => {
                let waited = Utc::now() - pending.created_at;
                log::info!(
                    "Resolved approval {} (attempt {}) after {}s: {:?}",
                    workflow_id,
                    pending.metadata.attempt,
                    waited.num_seconds(),
                    decision
                );
                if pending.completion.send(decision).is_err() {
                    log::warn!("Waiter for approval {} is gone; decision dropped", workflow_id);
                }
                true
            }
            None => {
                log::debug!("No pending approval for {}", workflow_id);
                false
            }
        }
    }

    /// Timer path: resolve as timed out, but only if the entry is still pending
    pub fn expire(&self, workflow_id: &WorkflowId) -> bool {
        let expired = self.resolve(workflow_id, ApprovalDecision::TimedOut);
        if !expired {
            log::debug!("Expiry for {} ignored, already resolved", workflow_id);
        }
        expired
    }

    /// Time out every pending round; used on shutdown so suspended runs end
    pub fn expire_all(&self) -> usize {
        let drained: Vec<(WorkflowId, PendingApproval)> = self.entries().drain().collect();
        let count = drained.len();
        for (workflow_id, pending) in drained {
            log::warn!("Expiring approval {} (attempt {}) on shutdown", workflow_id, pending.metadata.attempt);
            if pending.completion.send(ApprovalDecision::TimedOut).is_err() {
                log::debug!("Waiter for approval {} is already gone", workflow_id);
            }
        }
        count
    }

    pub fn contains(&self, workflow_id: &WorkflowId) -> bool {
        self.entries().contains_key(workflow_id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Snapshot of pending rounds, oldest first
    pub fn pending(&self) -> Vec<PendingSummary> {
        let mut pending: Vec<PendingSummary> = self
            .entries()
            .iter()
            .map(|(id, entry)| PendingSummary {
                workflow_id: id.clone(),
                created_at: entry.created_at,
                metadata: entry.metadata.clone(),
            })
            .collect();
        pending.sort_by_key(|p| p.created_at);
        pending
    }
}

/// Receiving side of one pending round
pub struct WaitHandle {
    workflow_id: WorkflowId,
    receiver: oneshot::Receiver<ApprovalDecision>,
    registry: Arc<PendingApprovalRegistry>,
}

impl WaitHandle {
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Wait for a decision or for `timeout`, whichever comes first.
    ///
    /// On timeout the entry is expired through the registry and the decision is
    /// then read from the channel, so a callback that won the race still
    /// delivers its decision and exactly one decision is ever observed.
    pub async fn wait(mut self, timeout: Duration) -> ApprovalDecision {
        tokio::select! {
            received = &mut self.receiver => settle(&self.workflow_id, received),
            _ = tokio::time::sleep(timeout) => {
                if self.registry.expire(&self.workflow_id) {
                    log::warn!("Approval {} timed out after {:?}", self.workflow_id, timeout);
                }
                settle(&self.workflow_id, (&mut self.receiver).await)
            }
        }
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        // No-op once the round has been resolved
        if self.registry.resolve(&self.workflow_id, ApprovalDecision::TimedOut) {
            log::warn!("Approval {} abandoned by its waiter; entry expired", self.workflow_id);
        }
    }
}

impl std::fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitHandle")
            .field("workflow_id", &self.workflow_id)
            .finish_non_exhaustive()
    }
}

fn settle(
    workflow_id: &WorkflowId,
    received: std::result::Result<ApprovalDecision, oneshot::error::RecvError>,
) -> ApprovalDecision {
    match received {
        Ok(decision) => decision,
        Err(_) => {
            log::error!("Approval {} was dropped without a decision", workflow_id);
            ApprovalDecision::TimedOut
        }
    }
}
