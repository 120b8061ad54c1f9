use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::capacity::CapacitySignal;
use crate::metrics;

/// Fraction the capacity estimate is scaled by while throttled. Keeps the
/// estimate a monotone function of the throttle flag.
const THROTTLED_CAPACITY_FACTOR: f64 = 0.3;

/// Process-wide admission throttle plus the set of restricted SKUs.
///
/// Reads are hot (every admission consults them) and lock-free where
/// possible: the flag is an atomic, the SKU set sits behind a
/// reader-friendly lock. `activate`/`deactivate` serialize on the write
/// lock so the flag and the set always change together.
#[derive(Clone)]
pub struct BackpressureController {
    throttled: Arc<AtomicBool>,
    restricted: Arc<RwLock<HashSet<String>>>,
    signal: Arc<dyn CapacitySignal>,
}

impl BackpressureController {
    pub fn new(signal: Arc<dyn CapacitySignal>) -> Self {
        Self {
            throttled: Arc::new(AtomicBool::new(false)),
            restricted: Arc::new(RwLock::new(HashSet::new())),
            signal,
        }
    }

    /// Turn on system-wide throttling. Idempotent.
    pub fn activate(&self, reason: &str) {
        let _restricted = self.restricted.write();
        let prev = self.throttled.swap(true, Ordering::SeqCst);
        if !prev {
            warn!("🚨 Backpressure activated: {}", reason);
            metrics::set_throttle_state(true);
        }
    }

    /// Turn off throttling and clear every SKU restriction. This is the only
    /// place restrictions are removed.
    pub fn deactivate(&self) {
        let mut restricted = self.restricted.write();
        let prev = self.throttled.swap(false, Ordering::SeqCst);
        restricted.clear();
        metrics::set_restricted_skus(0);
        if prev {
            info!("✅ System health restored. Backpressure deactivated, SKU restrictions cleared.");
            metrics::set_throttle_state(false);
        }
    }

    /// Add a SKU to the restricted set. Add-only; restrictions placed while
    /// not throttled are inert until `activate` (pre-staging).
    pub fn restrict(&self, sku: &str) {
        let mut restricted = self.restricted.write();
        if restricted.insert(sku.to_string()) {
            info!("Restricting SKU {} to preserve high-priority production", sku);
            metrics::set_restricted_skus(restricted.len() as i64);
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::SeqCst)
    }

    pub fn is_sku_restricted(&self, sku: &str) -> bool {
        self.restricted.read().contains(sku)
    }

    pub fn restricted_skus(&self) -> HashSet<String> {
        self.restricted.read().clone()
    }

    pub fn store_overloaded(&self, store_id: &str) -> bool {
        self.signal.is_store_overloaded(store_id)
    }

    /// Cheap, non-blocking estimate in [0, 1]. Lower while throttled.
    pub fn capacity_estimate(&self) -> f64 {
        let baseline = self.signal.baseline_capacity();
        if self.is_throttled() {
            baseline * THROTTLED_CAPACITY_FACTOR
        } else {
            baseline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::StaticCapacitySignal;

    fn controller() -> BackpressureController {
        BackpressureController::new(Arc::new(StaticCapacitySignal::default()))
    }

    #[test]
    fn test_activate_deactivate() {
        let bp = controller();
        assert!(!bp.is_throttled());

        bp.activate("load spike");
        assert!(bp.is_throttled());

        // Idempotent re-activation
        bp.activate("load spike again");
        assert!(bp.is_throttled());

        bp.deactivate();
        assert!(!bp.is_throttled());
    }

    #[test]
    fn test_deactivate_clears_restrictions() {
        let bp = controller();
        bp.activate("overload");
        bp.restrict("SKU-PIZZA");
        bp.restrict("SKU-PASTA");
        assert_eq!(bp.restricted_skus().len(), 2);

        bp.deactivate();
        assert!(bp.restricted_skus().is_empty());
        assert!(!bp.is_sku_restricted("SKU-PIZZA"));
    }

    #[test]
    fn test_restrict_without_throttle_is_prestaged() {
        let bp = controller();
        bp.restrict("SKU-PIZZA");

        // Restriction exists but the system is not throttled
        assert!(!bp.is_throttled());
        assert!(bp.is_sku_restricted("SKU-PIZZA"));
    }

    #[test]
    fn test_capacity_estimate_monotone_in_throttle() {
        let bp = controller();
        let open = bp.capacity_estimate();
        bp.activate("test");
        let throttled = bp.capacity_estimate();

        assert!(throttled < open);
        assert!((0.0..=1.0).contains(&open));
        assert!((0.0..=1.0).contains(&throttled));
    }
}
