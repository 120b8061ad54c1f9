use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AdmissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REJECTED")]
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// Inbound order payload. Field names mirror the intake API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub store_id: String,
    pub delivery_address: String,
}

impl OrderRequest {
    /// Structural validation. Rejects requests that could never be fulfilled
    /// regardless of capacity.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.items.is_empty() {
            return Err(AdmissionError::Validation("order has no items".into()));
        }
        for item in &self.items {
            if item.sku.is_empty() {
                return Err(AdmissionError::Validation("item has empty SKU".into()));
            }
            if item.quantity == 0 {
                return Err(AdmissionError::Validation(format!(
                    "non-positive quantity for SKU {}",
                    item.sku
                )));
            }
            if item.price <= Decimal::ZERO {
                return Err(AdmissionError::Validation(format!(
                    "non-positive price for SKU {}",
                    item.sku
                )));
            }
        }
        Ok(())
    }

    pub fn skus(&self) -> Vec<String> {
        self.items.iter().map(|i| i.sku.clone()).collect()
    }
}

/// The response computed for an admitted order. Once stored under an
/// idempotency key this value is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: String,
    pub status: OrderStatus,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub estimated_prep_time: String,
}

/// Event published to the production planner after an order is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: String,
    pub store_id: String,
    pub skus: Vec<String>,
    pub deadline: DateTime<Utc>,
}

// --- Operational control surface payloads (health-feedback mechanism) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottleAction {
    #[serde(rename = "ACTIVATE")]
    Activate,
    #[serde(rename = "DEACTIVATE")]
    Deactivate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleCommand {
    pub action: ThrottleAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictCommand {
    pub sku: String,
}
