use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use prepline_coordination_rs::admission::{AdmissionConfig, OrderAdmission};
use prepline_coordination_rs::api;
use prepline_coordination_rs::audit::AuditTrail;
use prepline_coordination_rs::backpressure::BackpressureController;
use prepline_coordination_rs::capacity::StaticCapacitySignal;
use prepline_coordination_rs::claimer::TaskClaimer;
use prepline_coordination_rs::config::Settings;
use prepline_coordination_rs::context::CoordinationContext;
use prepline_coordination_rs::model::{RestrictCommand, ThrottleAction, ThrottleCommand};
use prepline_coordination_rs::notifier::NatsPlanningNotifier;
use prepline_coordination_rs::sla::{spawn_sweeper, SlaMonitor, SlaPolicy};
use prepline_coordination_rs::store::{IdempotencyStore, OrderStore};
use prepline_coordination_rs::subjects;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("╔═══════════════════════════════════════════════════════════════╗");
    info!("║             PREPLINE COORDINATION - Fulfillment Core          ║");
    info!("║        Admission / Claiming / SLA / Backpressure Service      ║");
    info!("╚═══════════════════════════════════════════════════════════════╝");

    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::new().unwrap_or_else(|e| {
        warn!("Failed to load settings ({}), using defaults", e);
        Settings::default()
    });
    let coord = settings.coordination.clone();

    // Initialize Core Components
    let ctx = CoordinationContext::new_system();
    let audit = AuditTrail::new(coord.audit_max_entries_per_entity);
    let backpressure = BackpressureController::new(Arc::new(StaticCapacitySignal::default()));
    let sla = SlaMonitor::new(
        ctx.clone(),
        audit.clone(),
        backpressure.clone(),
        SlaPolicy {
            risk_window_ms: coord.risk_window_minutes * 60_000,
            breach_window_ms: coord.breach_window_ms,
            breach_threshold: coord.breach_threshold,
        },
    );
    let claimer = TaskClaimer::new(ctx.clone(), audit.clone());

    info!("✅ Core components initialized");

    // Connect to NATS
    let nats_url = settings.server.nats_url.clone();
    info!("Connecting to NATS at {}", nats_url);

    let client = match async_nats::connect(&nats_url).await {
        Ok(c) => {
            info!("✅ Connected to NATS");
            c
        }
        Err(e) => {
            error!("❌ Failed to connect to NATS: {}", e);
            std::process::exit(1);
        }
    };

    let notifier = Arc::new(NatsPlanningNotifier::new(client.clone()));
    let admission = OrderAdmission::new(
        IdempotencyStore::new(),
        OrderStore::new(),
        backpressure.clone(),
        sla.clone(),
        notifier,
        audit.clone(),
        ctx.clone(),
        AdmissionConfig {
            sla_window_minutes: coord.sla_window_minutes,
            estimated_prep_minutes: coord.estimated_prep_minutes,
        },
    );

    // --- Operational Control Consumer Task ---
    // Health-feedback mechanism only; never exposed to end users.
    let subject = subjects::CMD_CAPACITY_WILDCARD;
    let mut subscription = client.subscribe(subject.to_string()).await?;
    info!("🚀 Listening for capacity commands on '{}'", subject);

    let bp_for_nats = backpressure.clone();
    let audit_for_nats = audit.clone();
    let sla_for_nats = sla.clone();
    let nats_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = subscription.next() => {
                    match msg.subject.as_str() {
                        subjects::CMD_CAPACITY_THROTTLE => {
                            match serde_json::from_slice::<ThrottleCommand>(&msg.payload) {
                                Ok(cmd) => match cmd.action {
                                    ThrottleAction::Activate => {
                                        let reason = cmd
                                            .reason
                                            .unwrap_or_else(|| "operator command".to_string());
                                        bp_for_nats.activate(&reason);
                                        audit_for_nats.record(
                                            "capacity-controller",
                                            "THROTTLE_ACTIVATED",
                                            "health-feedback",
                                            &reason,
                                        );
                                    }
                                    ThrottleAction::Deactivate => {
                                        bp_for_nats.deactivate();
                                        audit_for_nats.record(
                                            "capacity-controller",
                                            "THROTTLE_DEACTIVATED",
                                            "health-feedback",
                                            "restrictions cleared",
                                        );
                                    }
                                },
                                Err(e) => error!("Failed to deserialize throttle command: {}", e),
                            }
                        }
                        subjects::CMD_CAPACITY_RESTRICT => {
                            match serde_json::from_slice::<RestrictCommand>(&msg.payload) {
                                Ok(cmd) => {
                                    bp_for_nats.restrict(&cmd.sku);
                                    audit_for_nats.record(
                                        "capacity-controller",
                                        "SKU_RESTRICTED",
                                        "health-feedback",
                                        &cmd.sku,
                                    );
                                }
                                Err(e) => error!("Failed to deserialize restrict command: {}", e),
                            }
                        }
                        other => warn!("Ignoring unknown capacity subject '{}'", other),
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(60)) => {
                    info!(
                        "Heartbeat... Tracked deadlines: {}, throttled: {}",
                        sla_for_nats.tracked_count(),
                        bp_for_nats.is_throttled()
                    );
                }
            }
        }
    });

    // --- SLA Sweeper Task ---
    let sweeper = spawn_sweeper(sla.clone(), Duration::from_millis(coord.sweep_period_ms));

    // --- API Server Task ---
    let bind_address = format!("0.0.0.0:{}", settings.server.port);
    info!("🚀 Starting API Server on {}", bind_address);

    let prometheus = PrometheusMetricsBuilder::new("prepline")
        .registry(prometheus::default_registry().clone())
        .endpoint("/metrics")
        .build()
        .expect("prometheus middleware");

    let app_state = web::Data::new(api::AppState {
        admission,
        claimer,
        sla,
        backpressure,
        audit,
    });

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(prometheus.clone())
            .app_data(app_state.clone())
            .configure(api::config)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    // Orderly shutdown once the server stops
    sweeper.stop().await;
    nats_handle.abort();

    Ok(())
}
