use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::OrderResult;

/// In-memory idempotency store: client-supplied key -> previously computed
/// response. A key's value is written at most once and never updated.
///
/// The durable equivalent would live behind the same interface (key space:
/// idempotency key -> full response); only the in-memory contract lives here.
#[derive(Clone, Default)]
pub struct IdempotencyStore {
    entries: Arc<DashMap<String, OrderResult>>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<OrderResult> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Atomic write-if-absent. Two callers racing on the same key resolve to
    /// a single stored value; the map entry guard makes the check-and-insert
    /// one operation. Returns the stored value plus whether this caller won
    /// the write.
    pub fn put_if_absent(&self, key: &str, result: OrderResult) -> (OrderResult, bool) {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(key, "idempotency key already written, returning winner");
                (existing.get().clone(), false)
            }
            Entry::Vacant(slot) => {
                let stored = slot.insert(result);
                (stored.clone(), true)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order lookup store: system-generated order id -> result. Written only by
/// the admission path that won the idempotency write.
#[derive(Clone, Default)]
pub struct OrderStore {
    orders: Arc<DashMap<String, OrderResult>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order_id: &str, result: OrderResult) {
        self.orders.insert(order_id.to_string(), result);
    }

    pub fn get(&self, order_id: &str) -> Option<OrderResult> {
        self.orders.get(order_id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }
}
