use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::audit::AuditTrail;
use crate::backpressure::BackpressureController;
use crate::context::CoordinationContext;
use crate::error::{AdmissionError, RejectReason};
use crate::metrics;
use crate::model::{OrderPlaced, OrderRequest, OrderResult, OrderStatus};
use crate::notifier::PlanningNotifier;
use crate::sla::SlaMonitor;
use crate::store::{IdempotencyStore, OrderStore};

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub sla_window_minutes: i64,
    pub estimated_prep_minutes: i64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            sla_window_minutes: 25,
            estimated_prep_minutes: 25,
        }
    }
}

/// Idempotent front door for new orders. Consults the backpressure gate,
/// writes the idempotency store exactly once per key, registers the deadline
/// and notifies the planner.
#[derive(Clone)]
pub struct OrderAdmission {
    idempotency: IdempotencyStore,
    orders: OrderStore,
    backpressure: BackpressureController,
    sla: SlaMonitor,
    notifier: Arc<dyn PlanningNotifier>,
    audit: AuditTrail,
    ctx: CoordinationContext,
    config: AdmissionConfig,
}

impl OrderAdmission {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        idempotency: IdempotencyStore,
        orders: OrderStore,
        backpressure: BackpressureController,
        sla: SlaMonitor,
        notifier: Arc<dyn PlanningNotifier>,
        audit: AuditTrail,
        ctx: CoordinationContext,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            idempotency,
            orders,
            backpressure,
            sla,
            notifier,
            audit,
            ctx,
            config,
        }
    }

    /// Admit an order. Repeating a key replays the stored result with no
    /// side effects; a rejection never consumes the key, so a later retry
    /// under the same key can still succeed.
    pub fn submit(
        &self,
        idempotency_key: &str,
        request: OrderRequest,
    ) -> Result<OrderResult, AdmissionError> {
        if let Some(existing) = self.idempotency.get(idempotency_key) {
            warn!(
                "Duplicate request detected for key {}. Returning recorded response.",
                idempotency_key
            );
            metrics::inc_duplicate_submissions();
            return Ok(existing);
        }

        if idempotency_key.is_empty() {
            metrics::inc_validation_failures();
            return Err(AdmissionError::Validation(
                "idempotency key must not be empty".into(),
            ));
        }
        if let Err(e) = request.validate() {
            metrics::inc_validation_failures();
            return Err(e);
        }

        if let Err(reason) = self.check_backpressure(&request) {
            info!("Order rejected for key {}: {}", idempotency_key, reason);
            metrics::inc_orders_rejected();
            return Err(AdmissionError::Rejected { reason });
        }

        let now = self.ctx.time.now();
        let order_id = format!(
            "ORD-{}",
            self.ctx.id.new_id()[..8].to_uppercase()
        );
        let result = OrderResult {
            order_id: order_id.clone(),
            status: OrderStatus::Accepted,
            idempotency_key: idempotency_key.to_string(),
            created_at: now,
            deadline: now + Duration::minutes(self.config.sla_window_minutes),
            estimated_prep_time: format!("{} mins", self.config.estimated_prep_minutes),
        };

        let (winner, won) = self.idempotency.put_if_absent(idempotency_key, result);
        if !won {
            // A concurrent submission under the same key beat us; its result
            // is the order of record and our side effects must not run.
            warn!(
                "Concurrent duplicate for key {} resolved to order {}",
                idempotency_key, winner.order_id
            );
            metrics::inc_duplicate_submissions();
            return Ok(winner);
        }

        self.orders.insert(&winner.order_id, winner.clone());
        self.sla.track(
            &winner.order_id,
            Duration::minutes(self.config.sla_window_minutes),
        );
        self.audit.record(
            &winner.order_id,
            "ORDER_ACCEPTED",
            &request.customer_id,
            &format!("{} items for store {}", request.items.len(), request.store_id),
        );
        metrics::inc_orders_accepted();
        info!("Order {} accepted successfully", winner.order_id);

        self.notify_planner(OrderPlaced {
            order_id: winner.order_id.clone(),
            store_id: request.store_id.clone(),
            skus: request.skus(),
            deadline: winner.deadline,
        });

        Ok(winner)
    }

    pub fn get_order(&self, order_id: &str) -> Option<OrderResult> {
        self.orders.get(order_id)
    }

    fn check_backpressure(&self, request: &OrderRequest) -> Result<(), RejectReason> {
        if self.backpressure.is_throttled() {
            if let Some(item) = request
                .items
                .iter()
                .find(|i| self.backpressure.is_sku_restricted(&i.sku))
            {
                return Err(RejectReason::RestrictedSku(item.sku.clone()));
            }
        }
        if self.backpressure.store_overloaded(&request.store_id) {
            return Err(RejectReason::StoreOverloaded(request.store_id.clone()));
        }
        Ok(())
    }

    /// Fire-and-forget. The admission response never waits on the planner,
    /// and a failed publish is audited instead of propagated.
    fn notify_planner(&self, event: OrderPlaced) {
        let notifier = self.notifier.clone();
        let audit = self.audit.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.order_placed(&event).await {
                error!("Failed to notify planner for {}: {}", event.order_id, e);
                audit.record(
                    &event.order_id,
                    "PLAN_NOTIFY_FAILED",
                    "order-admission",
                    &e.to_string(),
                );
            }
        });
    }
}
