use crate::errors::MonitorError;
use crate::metrics;
use crate::models::*;
use crate::monitor::TransactionMonitor;
use actix_web::{web, HttpResponse};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Prometheus registry served by `/metrics`
pub struct MetricsRegistry(pub Registry);

/// Process start, for uptime reporting
pub struct StartedAt(pub Instant);

// ===== Health Check =====
pub async fn health_check(
    monitor: web::Data<Arc<TransactionMonitor>>,
    started: web::Data<StartedAt>,
) -> HttpResponse {
    let store = monitor.store();
    let status = match store.health_check().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            "degraded"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        storage: store.backend().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: started.0.elapsed().as_secs(),
    })
}

// ===== Prometheus Metrics =====
pub async fn metrics_endpoint(registry: web::Data<MetricsRegistry>) -> HttpResponse {
    match metrics::render(&registry.0) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

// ===== Monitor Transaction =====
pub async fn monitor_transaction(
    req: web::Json<MonitorTransactionRequest>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    let outcome = monitor.monitor(req.into_inner()).await?;

    Ok(HttpResponse::Created().json(MonitorTransactionResponse {
        message: "Transaction monitored".to_string(),
        transaction_id: outcome.transaction.id,
        threat_score: outcome.result.score.score(),
        threat_level: outcome.result.level(),
        flags: outcome.result.flags,
        alert_raised: outcome.alert.is_some(),
    }))
}

// ===== List Transactions =====
pub async fn list_transactions(
    query: web::Query<ListQuery>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.list_transactions(query.limit).await?))
}

// ===== Flagged Transactions =====
pub async fn flagged_transactions(
    query: web::Query<ListQuery>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.flagged_transactions(query.limit).await?))
}

// ===== Override Threat Score =====
pub async fn override_threat_score(
    req: web::Json<ThreatScoreOverrideRequest>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.override_threat_score(req.into_inner()).await?))
}

// ===== Dashboard Summary =====
pub async fn dashboard_summary(
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.dashboard_summary().await?))
}

// ===== Suspicious Transactions =====
pub async fn suspicious_transactions(
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.suspicious_transactions().await?))
}

// ===== Recent Alerts =====
pub async fn recent_alerts(
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    Ok(HttpResponse::Ok().json(monitor.recent_alerts().await?))
}

// ===== User Locations =====
pub async fn user_locations(
    path: web::Path<String>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    let user_id = path.into_inner();
    Ok(HttpResponse::Ok().json(monitor.user_locations(&user_id).await?))
}

// ===== Upsert User Profile =====
pub async fn upsert_user(
    path: web::Path<String>,
    req: web::Json<UpsertUserRequest>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    let profile = monitor
        .upsert_user(path.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

// ===== Verify Device =====
pub async fn verify_device(
    req: web::Json<VerifyDeviceRequest>,
    monitor: web::Data<Arc<TransactionMonitor>>,
) -> Result<HttpResponse, MonitorError> {
    let is_known_device = monitor.verify_device(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(VerifyDeviceResponse { is_known_device }))
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/transactions", web::get().to(list_transactions))
            .route("/transactions/monitor", web::post().to(monitor_transaction))
            .route(
                "/transactions/suspicious",
                web::get().to(suspicious_transactions),
            )
            .route(
                "/flagged-transactions",
                web::get().to(flagged_transactions),
            )
            .route("/threat-score", web::post().to(override_threat_score))
            .route("/dashboard/summary", web::get().to(dashboard_summary))
            .route("/alerts", web::get().to(recent_alerts))
            .route("/users/{user_id}", web::put().to(upsert_user))
            .route("/users/{user_id}/locations", web::get().to(user_locations))
            .route("/verify/device", web::post().to(verify_device)),
    )
    .route("/health", web::get().to(health_check))
    .route("/metrics", web::get().to(metrics_endpoint));
}
