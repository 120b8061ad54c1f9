use chrono::Duration as ChronoDuration;
use prepline_coordination_rs::audit::AuditTrail;
use prepline_coordination_rs::backpressure::BackpressureController;
use prepline_coordination_rs::capacity::StaticCapacitySignal;
use prepline_coordination_rs::context::{
    CoordinationContext, SequentialIdProvider, SimulatedTimeProvider,
};
use prepline_coordination_rs::sla::{spawn_sweeper, SlaMonitor, SlaPolicy};
use std::sync::Arc;
use std::time::Duration;

struct SweepHarness {
    monitor: SlaMonitor,
    clock: Arc<SimulatedTimeProvider>,
    audit: AuditTrail,
    backpressure: BackpressureController,
}

fn create_monitor(policy: SlaPolicy) -> SweepHarness {
    let clock = Arc::new(SimulatedTimeProvider::new(0));
    let ctx = CoordinationContext {
        time: clock.clone(),
        id: Arc::new(SequentialIdProvider::new()),
    };
    let audit = AuditTrail::default();
    let backpressure = BackpressureController::new(Arc::new(StaticCapacitySignal::default()));
    let monitor = SlaMonitor::new(ctx, audit.clone(), backpressure.clone(), policy);
    SweepHarness {
        monitor,
        clock,
        audit,
        backpressure,
    }
}

fn breach_count(audit: &AuditTrail, order_id: &str) -> usize {
    audit
        .history(order_id)
        .iter()
        .filter(|e| e.action == "SLA_BREACH")
        .count()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_background_sweep_detects_breach_exactly_once() {
    let h = create_monitor(SlaPolicy::default());

    h.monitor.track("o1", ChronoDuration::seconds(1));
    let sweeper = spawn_sweeper(h.monitor.clone(), Duration::from_millis(20));

    // 2s of order time elapse; the sweep runs several cycles over the breach
    h.clock.advance(2_000);
    tokio::time::sleep(Duration::from_millis(200)).await;
    sweeper.stop().await;

    assert!(!h.monitor.is_tracked("o1"), "breached entry must be removed");
    assert_eq!(breach_count(&h.audit, "o1"), 1);
}

#[tokio::test]
async fn test_risk_signal_leaves_entry_tracked() {
    let h = create_monitor(SlaPolicy::default());

    h.monitor.track("o1", ChronoDuration::minutes(6));
    h.clock.advance(3 * 60 * 1000);
    h.monitor.sweep();

    // 3 minutes from deadline sits inside the 5 minute risk window
    assert!(h.monitor.is_tracked("o1"));
    assert_eq!(breach_count(&h.audit, "o1"), 0);
}

#[tokio::test]
async fn test_completion_during_sweep_window_suppresses_breach() {
    let h = create_monitor(SlaPolicy::default());

    h.monitor.track("o1", ChronoDuration::seconds(1));
    h.clock.advance(10_000);

    // The order finishes late but before the sweep observes it
    h.monitor.complete("o1");
    h.monitor.sweep();

    assert_eq!(breach_count(&h.audit, "o1"), 0);
    assert!(!h.monitor.is_tracked("o1"));
}

#[tokio::test]
async fn test_breach_storm_escalates_into_throttling() {
    let policy = SlaPolicy {
        breach_threshold: 3,
        ..SlaPolicy::default()
    };
    let h = create_monitor(policy);

    for i in 0..4 {
        h.monitor.track(&format!("o{}", i), ChronoDuration::seconds(1));
    }

    h.clock.advance(5_000);
    h.monitor.sweep();

    assert!(
        h.backpressure.is_throttled(),
        "repeated breaches must activate backpressure"
    );
}

#[tokio::test]
async fn test_isolated_breach_does_not_escalate() {
    let h = create_monitor(SlaPolicy::default());

    h.monitor.track("o1", ChronoDuration::seconds(1));
    h.clock.advance(5_000);
    h.monitor.sweep();

    assert!(!h.backpressure.is_throttled());
}

#[tokio::test]
async fn test_delayed_sweep_still_detects_breach() {
    let h = create_monitor(SlaPolicy::default());

    h.monitor.track("o1", ChronoDuration::seconds(1));

    // Far past the deadline before any sweep runs: level-triggered detection
    h.clock.advance(60 * 60 * 1000);
    h.monitor.sweep();

    assert_eq!(breach_count(&h.audit, "o1"), 1);
}
