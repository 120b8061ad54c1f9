use chrono::Duration;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::audit::AuditTrail;
use crate::backpressure::BackpressureController;
use crate::context::CoordinationContext;
use crate::metrics;

/// Tuning for breach handling. Thresholds are deployment policy, not core
/// constants.
#[derive(Debug, Clone)]
pub struct SlaPolicy {
    /// How close to the deadline an order gets before a risk signal fires.
    pub risk_window_ms: i64,
    /// Rolling window over which breaches are counted for escalation.
    pub breach_window_ms: i64,
    /// Breach count within the window that triggers backpressure.
    pub breach_threshold: usize,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            risk_window_ms: 5 * 60 * 1000,
            breach_window_ms: 60 * 1000,
            breach_threshold: 3,
        }
    }
}

/// Rolling breach counter behind the escalation decision. Old events age out
/// of the window on every insert.
struct BreachEscalation {
    recent: VecDeque<i64>,
    policy: SlaPolicy,
}

impl BreachEscalation {
    fn record_breach(&mut self, now_ms: i64) -> bool {
        self.recent.push_back(now_ms);
        while let Some(&oldest) = self.recent.front() {
            if now_ms - oldest > self.policy.breach_window_ms {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        self.recent.len() >= self.policy.breach_threshold
    }
}

/// Tracks absolute deadlines per order and periodically sweeps them for
/// breaches. The sweep never holds a table-wide lock: it iterates a snapshot
/// and re-checks each removal, so concurrent `track`/`complete` calls stay
/// safe at the cost of one sweep cycle of staleness.
#[derive(Clone)]
pub struct SlaMonitor {
    deadlines: Arc<DashMap<String, i64>>,
    escalation: Arc<Mutex<BreachEscalation>>,
    ctx: CoordinationContext,
    audit: AuditTrail,
    backpressure: BackpressureController,
    policy: SlaPolicy,
}

impl SlaMonitor {
    pub fn new(
        ctx: CoordinationContext,
        audit: AuditTrail,
        backpressure: BackpressureController,
        policy: SlaPolicy,
    ) -> Self {
        Self {
            deadlines: Arc::new(DashMap::new()),
            escalation: Arc::new(Mutex::new(BreachEscalation {
                recent: VecDeque::new(),
                policy: policy.clone(),
            })),
            ctx,
            audit,
            backpressure,
            policy,
        }
    }

    /// Start tracking an order against deadline = now + window. At most one
    /// deadline entry exists per order id.
    pub fn track(&self, order_id: &str, window: Duration) {
        let deadline_ms = self.ctx.time.now_millis() + window.num_milliseconds();
        self.deadlines.insert(order_id.to_string(), deadline_ms);
        metrics::set_tracked_deadlines(self.deadlines.len() as i64);
        info!(
            "SLA tracking started for order {} (deadline in {}s)",
            order_id,
            window.num_seconds()
        );
    }

    /// Stop tracking a completed order. Idempotent if the order is unknown
    /// or already swept.
    pub fn complete(&self, order_id: &str) {
        if self.deadlines.remove(order_id).is_some() {
            metrics::set_tracked_deadlines(self.deadlines.len() as i64);
            info!("SLA met for order {}", order_id);
            self.audit
                .record(order_id, "SLA_MET", "sla-monitor", "completed before deadline");
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_tracked(&self, order_id: &str) -> bool {
        self.deadlines.contains_key(order_id)
    }

    /// One breach-detection pass. Level-triggered: a delayed sweep still
    /// finds the breach. The remove is re-checked so a `complete` racing the
    /// sweep means the breach is reported once or not at all, never twice.
    pub fn sweep(&self) {
        let now = self.ctx.time.now_millis();
        let snapshot: Vec<(String, i64)> = self
            .deadlines
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();

        for (order_id, deadline_ms) in snapshot {
            if now > deadline_ms {
                // Only the caller whose remove returns the entry reports it
                if self.deadlines.remove(&order_id).is_some() {
                    self.on_breach(&order_id, now, deadline_ms);
                }
            } else if deadline_ms - now < self.policy.risk_window_ms {
                warn!(
                    "SLA RISK: order {} will breach in {}s",
                    order_id,
                    (deadline_ms - now) / 1000
                );
                metrics::inc_sla_risk_signals();
            }
        }
        metrics::set_tracked_deadlines(self.deadlines.len() as i64);
    }

    fn on_breach(&self, order_id: &str, now_ms: i64, deadline_ms: i64) {
        error!(
            "🚨 CRITICAL SLA BREACH: order {} is late by {}s",
            order_id,
            (now_ms - deadline_ms) / 1000
        );
        metrics::inc_sla_breaches();
        self.audit.record(
            order_id,
            "SLA_BREACH",
            "sla-monitor",
            &format!("deadline missed by {}ms", now_ms - deadline_ms),
        );

        let escalate = self.escalation.lock().record_breach(now_ms);
        if escalate {
            self.backpressure.activate(&format!(
                "SLA breach rate exceeded: {} breaches within {}ms",
                self.policy.breach_threshold, self.policy.breach_window_ms
            ));
        }
    }
}

/// Handle to the background sweep loop. Dropping the handle leaves the loop
/// running; call `stop` for an orderly shutdown.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn the periodic sweep as an explicit background task, independent of
/// request-serving paths.
pub fn spawn_sweeper(monitor: SlaMonitor, period: std::time::Duration) -> SweeperHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("SLA sweeper running every {:?}", period);
        loop {
            tokio::select! {
                _ = ticker.tick() => monitor.sweep(),
                _ = shutdown_rx.changed() => {
                    info!("SLA sweeper stopped");
                    break;
                }
            }
        }
    });
    SweeperHandle { shutdown, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::StaticCapacitySignal;
    use crate::context::SimulatedTimeProvider;
    use crate::context::SequentialIdProvider;

    fn simulated_monitor(policy: SlaPolicy) -> (SlaMonitor, Arc<SimulatedTimeProvider>) {
        let clock = Arc::new(SimulatedTimeProvider::new(0));
        let ctx = CoordinationContext {
            time: clock.clone(),
            id: Arc::new(SequentialIdProvider::new()),
        };
        let backpressure =
            BackpressureController::new(Arc::new(StaticCapacitySignal::default()));
        let monitor = SlaMonitor::new(ctx, AuditTrail::default(), backpressure, policy);
        (monitor, clock)
    }

    #[test]
    fn test_breach_detected_once_and_removed() {
        let (monitor, clock) = simulated_monitor(SlaPolicy::default());
        monitor.track("o1", Duration::seconds(1));

        clock.advance(2_000);
        monitor.sweep();
        assert!(!monitor.is_tracked("o1"));

        let breaches = monitor
            .audit
            .history("o1")
            .iter()
            .filter(|e| e.action == "SLA_BREACH")
            .count();
        assert_eq!(breaches, 1);

        // A second sweep finds nothing to re-report
        monitor.sweep();
        let breaches_after = monitor
            .audit
            .history("o1")
            .iter()
            .filter(|e| e.action == "SLA_BREACH")
            .count();
        assert_eq!(breaches_after, 1);
    }

    #[test]
    fn test_risk_window_does_not_remove() {
        let (monitor, clock) = simulated_monitor(SlaPolicy::default());
        monitor.track("o1", Duration::minutes(6));

        // 2 minutes from deadline: inside the 5 minute risk window
        clock.advance(4 * 60 * 1000);
        monitor.sweep();

        assert!(monitor.is_tracked("o1"), "risk signal must not remove");
    }

    #[test]
    fn test_complete_before_sweep_suppresses_breach() {
        let (monitor, clock) = simulated_monitor(SlaPolicy::default());
        monitor.track("o1", Duration::seconds(1));
        clock.advance(5_000);

        monitor.complete("o1");
        monitor.sweep();

        let breaches = monitor
            .audit
            .history("o1")
            .iter()
            .filter(|e| e.action == "SLA_BREACH")
            .count();
        assert_eq!(breaches, 0);
    }

    #[test]
    fn test_breach_storm_escalates_to_backpressure() {
        let policy = SlaPolicy {
            breach_threshold: 3,
            ..SlaPolicy::default()
        };
        let (monitor, clock) = simulated_monitor(policy);

        monitor.track("o1", Duration::seconds(1));
        monitor.track("o2", Duration::seconds(1));
        monitor.track("o3", Duration::seconds(1));

        clock.advance(2_000);
        monitor.sweep();

        assert!(monitor.backpressure.is_throttled());
    }

    #[test]
    fn test_single_breach_does_not_escalate() {
        let (monitor, clock) = simulated_monitor(SlaPolicy::default());
        monitor.track("o1", Duration::seconds(1));

        clock.advance(2_000);
        monitor.sweep();

        assert!(!monitor.backpressure.is_throttled());
    }
}
