use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics;

pub const DEFAULT_MAX_ENTRIES_PER_ENTITY: usize = 1024;

/// Immutable traceability record. Appended, never mutated or deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub details: String,
}

/// Append-only per-entity audit trail. Recording never blocks or fails the
/// primary operation; past the per-entity cap entries are dropped with a
/// warning and a counter so the degradation stays observable.
#[derive(Clone)]
pub struct AuditTrail {
    trail: Arc<DashMap<String, Vec<AuditEntry>>>,
    max_entries_per_entity: usize,
}

impl AuditTrail {
    pub fn new(max_entries_per_entity: usize) -> Self {
        Self {
            trail: Arc::new(DashMap::new()),
            max_entries_per_entity,
        }
    }

    pub fn record(&self, entity_id: &str, action: &str, actor: &str, details: &str) {
        let mut entries = self.trail.entry(entity_id.to_string()).or_default();
        if entries.len() >= self.max_entries_per_entity {
            warn!(
                entity_id,
                action, "audit trail full for entity, dropping entry"
            );
            metrics::inc_audit_entries_dropped();
            return;
        }

        entries.push(AuditEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            actor: actor.to_string(),
            details: details.to_string(),
        });
        info!("AUDIT [{}] {} by {} - {}", entity_id, action, actor, details);
    }

    /// Insertion-ordered history for an entity. Empty if nothing was recorded.
    pub fn history(&self, entity_id: &str) -> Vec<AuditEntry> {
        self.trail
            .get(entity_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES_PER_ENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_preserves_insertion_order() {
        let audit = AuditTrail::default();
        audit.record("ORD-1", "ORDER_ACCEPTED", "order-admission", "accepted");
        audit.record("ORD-1", "TASK_CLAIMED", "worker-7", "claimed PREP task");
        audit.record("ORD-1", "SLA_MET", "sla-monitor", "completed in time");

        let history = audit.history("ORD-1");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].action, "ORDER_ACCEPTED");
        assert_eq!(history[1].action, "TASK_CLAIMED");
        assert_eq!(history[2].action, "SLA_MET");
    }

    #[test]
    fn test_missing_entity_yields_empty_history() {
        let audit = AuditTrail::default();
        assert!(audit.history("ORD-MISSING").is_empty());
    }

    #[test]
    fn test_cap_drops_excess_entries() {
        let audit = AuditTrail::new(2);
        audit.record("ORD-1", "A", "x", "");
        audit.record("ORD-1", "B", "x", "");
        audit.record("ORD-1", "C", "x", "");

        let history = audit.history("ORD-1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, "B");
    }
}
