use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::AuditTrail;
use crate::context::CoordinationContext;
use crate::metrics;

/// Claim lifecycle: absent -> InProgress -> Completed. There is no release
/// transition and no exit from Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskClaim {
    pub worker_id: String,
    pub status: TaskStatus,
    pub claimed_at_ms: i64,
}

/// Outcome of a claim attempt. A duplicate claim is a normal result, not an
/// error; the caller decides whether the existing claim is its own or a
/// conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed { current: TaskClaim },
}

/// Exactly-once task claiming over an in-memory registry. The entry guard
/// makes test-and-insert a single atomic operation per task id; no external
/// lock is involved.
#[derive(Clone)]
pub struct TaskClaimer {
    registry: Arc<DashMap<String, TaskClaim>>,
    ctx: CoordinationContext,
    audit: AuditTrail,
}

impl TaskClaimer {
    pub fn new(ctx: CoordinationContext, audit: AuditTrail) -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            ctx,
            audit,
        }
    }

    pub fn claim(&self, task_id: &str, worker_id: &str) -> ClaimOutcome {
        match self.registry.entry(task_id.to_string()) {
            Entry::Occupied(existing) => {
                let current = existing.get().clone();
                warn!(
                    "TASK DUPLICATION PREVENTED: task {} is already {:?} (held by {})",
                    task_id, current.status, current.worker_id
                );
                metrics::inc_claim_conflicts();
                ClaimOutcome::AlreadyClaimed { current }
            }
            Entry::Vacant(slot) => {
                slot.insert(TaskClaim {
                    worker_id: worker_id.to_string(),
                    status: TaskStatus::InProgress,
                    claimed_at_ms: self.ctx.time.now_millis(),
                });
                info!("Task {} claimed by worker {}", task_id, worker_id);
                metrics::inc_tasks_claimed();
                self.audit
                    .record(task_id, "TASK_CLAIMED", worker_id, "production started");
                ClaimOutcome::Claimed
            }
        }
    }

    /// InProgress -> Completed. Idempotent: absent or already-completed tasks
    /// are left untouched and no error is raised.
    pub fn complete(&self, task_id: &str) {
        if let Some(mut claim) = self.registry.get_mut(task_id) {
            if claim.status == TaskStatus::InProgress {
                claim.status = TaskStatus::Completed;
                let worker = claim.worker_id.clone();
                drop(claim);
                info!("Task {} completed", task_id);
                self.audit
                    .record(task_id, "TASK_COMPLETED", &worker, "production finished");
            }
        }
    }

    pub fn status(&self, task_id: &str) -> Option<TaskClaim> {
        self.registry.get(task_id).map(|e| e.value().clone())
    }
}
