use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

// --- Admission Metrics ---

pub static ORDERS_ACCEPTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_orders_accepted_total",
        "Total orders admitted"
    )
    .expect("orders_accepted counter")
});

pub static ORDERS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_orders_rejected_total",
        "Total orders rejected by the backpressure gate"
    )
    .expect("orders_rejected counter")
});

pub static VALIDATION_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_validation_failures_total",
        "Total malformed order requests"
    )
    .expect("validation_failures counter")
});

pub static DUPLICATE_SUBMISSIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_duplicate_submissions_total",
        "Total submissions answered from the idempotency store"
    )
    .expect("duplicate_submissions counter")
});

// --- Task Metrics ---

pub static TASKS_CLAIMED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_tasks_claimed_total",
        "Total tasks successfully claimed"
    )
    .expect("tasks_claimed counter")
});

pub static CLAIM_CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_claim_conflicts_total",
        "Total duplicate claim attempts rejected"
    )
    .expect("claim_conflicts counter")
});

// --- SLA Metrics ---

pub static SLA_BREACHES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_sla_breaches_total",
        "Total SLA deadline breaches detected"
    )
    .expect("sla_breaches counter")
});

pub static SLA_RISK_SIGNALS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_sla_risk_signals_total",
        "Total orders observed inside the SLA risk window"
    )
    .expect("sla_risk_signals counter")
});

pub static TRACKED_DEADLINES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "prepline_coordination_tracked_deadlines",
        "Deadlines currently tracked by the SLA monitor"
    )
    .expect("tracked_deadlines gauge")
});

// --- Backpressure Metrics ---

pub static THROTTLE_STATE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "prepline_coordination_throttle_state",
        "Whether system-wide throttling is active (0=off, 1=on)"
    )
    .expect("throttle_state gauge")
});

pub static RESTRICTED_SKUS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "prepline_coordination_restricted_skus",
        "Number of currently restricted SKUs"
    )
    .expect("restricted_skus gauge")
});

// --- Audit Metrics ---

pub static AUDIT_ENTRIES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prepline_coordination_audit_entries_dropped_total",
        "Audit entries dropped after hitting the per-entity cap"
    )
    .expect("audit_entries_dropped counter")
});

pub fn inc_orders_accepted() {
    ORDERS_ACCEPTED.inc();
}

pub fn inc_orders_rejected() {
    ORDERS_REJECTED.inc();
}

pub fn inc_validation_failures() {
    VALIDATION_FAILURES.inc();
}

pub fn inc_duplicate_submissions() {
    DUPLICATE_SUBMISSIONS.inc();
}

pub fn inc_tasks_claimed() {
    TASKS_CLAIMED.inc();
}

pub fn inc_claim_conflicts() {
    CLAIM_CONFLICTS.inc();
}

pub fn inc_sla_breaches() {
    SLA_BREACHES.inc();
}

pub fn inc_sla_risk_signals() {
    SLA_RISK_SIGNALS.inc();
}

pub fn set_tracked_deadlines(count: i64) {
    TRACKED_DEADLINES.set(count);
}

pub fn set_throttle_state(active: bool) {
    THROTTLE_STATE.set(if active { 1 } else { 0 });
}

pub fn set_restricted_skus(count: i64) {
    RESTRICTED_SKUS.set(count);
}

pub fn inc_audit_entries_dropped() {
    AUDIT_ENTRIES_DROPPED.inc();
}
