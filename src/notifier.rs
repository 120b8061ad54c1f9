use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::model::OrderPlaced;
use crate::subjects;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to publish event: {0}")]
    Publish(String),
}

/// Outbound notification to the production planner. Fire-and-forget from the
/// admission path's point of view; a failed publish is logged and audited,
/// never surfaced as an admission failure.
#[async_trait]
pub trait PlanningNotifier: Send + Sync {
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError>;
}

pub struct NatsPlanningNotifier {
    client: async_nats::Client,
}

impl NatsPlanningNotifier {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlanningNotifier for NatsPlanningNotifier {
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(subjects::EVT_ORDER_PLACED.to_string(), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;
        info!("Emitted ORDER_PLACED event for {}", event.order_id);
        Ok(())
    }
}

/// Captures events in memory. Test double for the planning collaborator.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<OrderPlaced>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OrderPlaced> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl PlanningNotifier for RecordingNotifier {
    async fn order_placed(&self, event: &OrderPlaced) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
