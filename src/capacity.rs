use parking_lot::RwLock;
use std::collections::HashSet;

/// Pluggable capacity signal consumed by the backpressure controller.
/// Production wires this to the fleet health feed; tests substitute a
/// deterministic double.
pub trait CapacitySignal: Send + Sync {
    /// Whether the given store is currently reporting overload.
    fn is_store_overloaded(&self, store_id: &str) -> bool;

    /// Baseline capacity estimate in [0, 1] before throttling is applied.
    fn baseline_capacity(&self) -> f64;
}

/// Healthy-fleet signal: no overloaded stores, fixed baseline.
pub struct StaticCapacitySignal {
    baseline: f64,
}

impl StaticCapacitySignal {
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline: baseline.clamp(0.0, 1.0),
        }
    }
}

impl Default for StaticCapacitySignal {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl CapacitySignal for StaticCapacitySignal {
    fn is_store_overloaded(&self, _store_id: &str) -> bool {
        false
    }

    fn baseline_capacity(&self) -> f64 {
        self.baseline
    }
}

/// Deterministic signal with an explicit overloaded-store set. Used by tests
/// and by deployments that push store health from an external feed.
pub struct FixedCapacitySignal {
    overloaded: RwLock<HashSet<String>>,
    baseline: f64,
}

impl FixedCapacitySignal {
    pub fn new(baseline: f64) -> Self {
        Self {
            overloaded: RwLock::new(HashSet::new()),
            baseline: baseline.clamp(0.0, 1.0),
        }
    }

    pub fn mark_overloaded(&self, store_id: &str) {
        self.overloaded.write().insert(store_id.to_string());
    }

    pub fn clear_overloaded(&self, store_id: &str) {
        self.overloaded.write().remove(store_id);
    }
}

impl Default for FixedCapacitySignal {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl CapacitySignal for FixedCapacitySignal {
    fn is_store_overloaded(&self, store_id: &str) -> bool {
        self.overloaded.read().contains(store_id)
    }

    fn baseline_capacity(&self) -> f64 {
        self.baseline
    }
}
