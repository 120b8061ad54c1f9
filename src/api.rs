use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::admission::OrderAdmission;
use crate::audit::AuditTrail;
use crate::backpressure::BackpressureController;
use crate::claimer::TaskClaimer;
use crate::error::AdmissionError;
use crate::model::OrderRequest;
use crate::sla::SlaMonitor;

/// Shared handler state. Components are cheap clones over `Arc`-backed
/// internals, so one instance serves every worker thread.
pub struct AppState {
    pub admission: OrderAdmission,
    pub claimer: TaskClaimer,
    pub sla: SlaMonitor,
    pub backpressure: BackpressureController,
    pub audit: AuditTrail,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    throttled: bool,
    capacity_estimate: f64,
}

pub async fn health_check(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: "0.1.0".to_string(),
        throttled: data.backpressure.is_throttled(),
        capacity_estimate: data.backpressure.capacity_estimate(),
    })
}

pub async fn submit_order(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> impl Responder {
    let key = match req
        .headers()
        .get("X-Idempotency-Key")
        .and_then(|v| v.to_str().ok())
    {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "missing X-Idempotency-Key header"
            }));
        }
    };

    match data.admission.submit(&key, body.into_inner()) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(AdmissionError::Validation(msg)) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": msg
        })),
        Err(AdmissionError::Rejected { reason }) => {
            // 429: capacity rejection, safe to retry with backoff
            HttpResponse::TooManyRequests().json(serde_json::json!({
                "error": reason.to_string(),
                "reason": reason
            }))
        }
    }
}

pub async fn get_order(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let order_id = path.into_inner();
    match data.admission.get_order(&order_id) {
        Some(result) => HttpResponse::Ok().json(result),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("order {} not found", order_id)
        })),
    }
}

/// Downstream fulfillment reports the whole order done; the deadline entry
/// is released before the sweep can flag it.
pub async fn complete_order(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let order_id = path.into_inner();
    data.sla.complete(&order_id);
    HttpResponse::Ok().json(serde_json::json!({ "orderId": order_id, "status": "completed" }))
}

pub async fn order_history(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let order_id = path.into_inner();
    HttpResponse::Ok().json(serde_json::json!({
        "entityId": order_id,
        "entries": data.audit.history(&order_id)
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub worker_id: String,
}

pub async fn claim_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ClaimRequest>,
) -> impl Responder {
    let task_id = path.into_inner();
    let outcome = data.claimer.claim(&task_id, &body.worker_id);
    // Duplicate claims are a normal outcome, not an error status
    HttpResponse::Ok().json(outcome)
}

pub async fn complete_task(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let task_id = path.into_inner();
    data.claimer.complete(&task_id);
    HttpResponse::Ok().json(serde_json::json!({ "taskId": task_id, "status": "acknowledged" }))
}

// Define scope configuration
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/api/orders").route(web::post().to(submit_order)))
        .service(web::resource("/api/orders/{order_id}").route(web::get().to(get_order)))
        .service(
            web::resource("/api/orders/{order_id}/complete").route(web::post().to(complete_order)),
        )
        .service(web::resource("/api/orders/{order_id}/audit").route(web::get().to(order_history)))
        .service(web::resource("/api/tasks/{task_id}/claim").route(web::post().to(claim_task)))
        .service(
            web::resource("/api/tasks/{task_id}/complete").route(web::post().to(complete_task)),
        );
}
