//! HTTP API tests over the in-memory store

use actix_web::{http::StatusCode, test, web, App};
use prometheus::Registry;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use threat_engine::ThreatEvaluator;
use transaction_monitor::{
    config::AlertConfig,
    handlers::{self, MetricsRegistry, StartedAt},
    metrics, MemoryStore, TransactionMonitor,
};

fn monitor() -> Arc<TransactionMonitor> {
    Arc::new(TransactionMonitor::new(
        ThreatEvaluator::default(),
        Arc::new(MemoryStore::new()),
        AlertConfig::default(),
    ))
}

macro_rules! app {
    ($monitor:expr) => {{
        let registry = Registry::new();
        metrics::register_metrics(&registry).unwrap();
        test::init_service(
            App::new()
                .app_data(web::Data::new($monitor.clone()))
                .app_data(web::Data::new(MetricsRegistry(registry)))
                .app_data(web::Data::new(StartedAt(Instant::now())))
                .configure(handlers::configure_routes),
        )
        .await
    }};
}

macro_rules! submit {
    ($app:expr, $user:expr, $amount:expr, $ts:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/transactions/monitor")
            .set_json(json!({
                "userId": $user,
                "amount": $amount,
                "location": "Lisbon, PT",
                "device": "pixel",
                "timestamp": $ts
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body
    }};
}

#[actix_web::test]
async fn monitor_returns_created_with_score() {
    let monitor = monitor();
    let app = app!(monitor);

    let req = test::TestRequest::post()
        .uri("/api/transactions/monitor")
        .set_json(json!({
            "userId": "john-doe",
            "amount": 5000,
            "location": "New York, USA",
            "device": "iphone-15",
            "timestamp": "2024-03-24T02:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Transaction monitored");
    assert_eq!(body["threatScore"], 100);
    assert_eq!(body["threatLevel"], "high");
    assert_eq!(body["alertRaised"], true);
    assert_eq!(
        body["flags"],
        json!(["unusual_amount", "new_location", "odd_hours", "unknown_device"])
    );
}

#[actix_web::test]
async fn malformed_timestamp_is_bad_request() {
    let monitor = monitor();
    let app = app!(monitor);

    let req = test::TestRequest::post()
        .uri("/api/transactions/monitor")
        .set_json(json!({
            "userId": "john-doe",
            "amount": 50,
            "location": "Paris",
            "device": "pixel",
            "timestamp": "24/03/2024 2am"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn dashboard_summary_and_suspicious_list() {
    let monitor = monitor();
    let app = app!(monitor);

    let put = test::TestRequest::put()
        .uri("/api/users/sarah")
        .set_json(json!({"knownLocations": ["London, UK"], "devices": ["macbook"]}))
        .to_request();
    assert_eq!(test::call_service(&app, put).await.status(), StatusCode::OK);

    for (user, amount, location, device, ts) in [
        ("sarah", 200, "London, UK", "macbook", "2024-03-24 14:00:00"),
        ("sarah", 2500, "London, UK", "macbook", "2024-03-24 03:15:10"),
        ("mike", 8000, "Dubai, UAE", "android", "2024-03-24 10:45:33"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/transactions/monitor")
            .set_json(json!({
                "userId": user,
                "amount": amount,
                "location": location,
                "device": device,
                "timestamp": ts
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/dashboard/summary").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    // scores: 0, 50, 80
    assert_eq!(summary["totalTransactionsMonitored"], 3);
    assert_eq!(summary["highRiskAlertsCount"], 1);
    assert!((summary["averageThreatScore"].as_f64().unwrap() - 130.0 / 3.0).abs() < 1e-9);

    let req = test::TestRequest::get().uri("/api/transactions/suspicious").to_request();
    let suspicious: Value = test::call_and_read_body_json(&app, req).await;
    let suspicious = suspicious.as_array().unwrap();
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0]["userId"], "mike");
    assert_eq!(suspicious[0]["threatScore"], 80);

    let req = test::TestRequest::get().uri("/api/alerts").to_request();
    let alerts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(alerts[0]["alertMessage"], "High threat score detected");
    assert_eq!(alerts[0]["transactionId"], suspicious[0]["id"]);
}

#[actix_web::test]
async fn empty_dashboard_reports_zero_average() {
    let monitor = monitor();
    let app = app!(monitor);

    let req = test::TestRequest::get().uri("/api/dashboard/summary").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["averageThreatScore"], 0.0);
    assert_eq!(summary["totalTransactionsMonitored"], 0);
}

#[actix_web::test]
async fn user_lookups() {
    let monitor = monitor();
    let app = app!(monitor);

    let req = test::TestRequest::get().uri("/api/users/ghost/locations").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/verify/device")
        .set_json(json!({"userId": "ghost", "device": "x"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let put = test::TestRequest::put()
        .uri("/api/users/john")
        .set_json(json!({"knownLocations": ["New York, USA"], "devices": ["iphone-15"]}))
        .to_request();
    test::call_service(&app, put).await;

    let req = test::TestRequest::get().uri("/api/users/john/locations").to_request();
    let locations: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(locations, json!(["New York, USA"]));

    let req = test::TestRequest::post()
        .uri("/api/verify/device")
        .set_json(json!({"userId": "john", "device": "iphone-15"}))
        .to_request();
    let verified: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(verified, json!({"isKnownDevice": true}));

    let req = test::TestRequest::post()
        .uri("/api/verify/device")
        .set_json(json!({"userId": "john", "device": "burner"}))
        .to_request();
    let verified: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(verified, json!({"isKnownDevice": false}));
}

#[actix_web::test]
async fn health_and_metrics() {
    let monitor = monitor();
    let app = app!(monitor);

    let req = test::TestRequest::get().uri("/health").to_request();
    let health: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["storage"], "memory");

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn stored_timestamps_keep_their_offset() {
    let monitor = monitor();
    let app = app!(monitor);

    submit!(app, "ana", 10, "2024-03-24T02:30:00+04:00");
    submit!(app, "ana", 10, "2024-03-24T02:30:00-08:00");

    let req = test::TestRequest::get().uri("/api/transactions").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed[0]["timestamp"], "2024-03-24T10:30:00Z");
    assert_eq!(listed[1]["timestamp"], "2024-03-23T22:30:00Z");
}

#[actix_web::test]
async fn transaction_listing_and_flagged() {
    let monitor = monitor();
    let app = app!(monitor);

    let put = test::TestRequest::put()
        .uri("/api/users/ana")
        .set_json(json!({"knownLocations": ["Lisbon, PT"], "devices": ["pixel"]}))
        .to_request();
    test::call_service(&app, put).await;

    let clean = submit!(app, "ana", 10, "2024-03-24 12:00:00");
    let late = submit!(app, "ana", 10, "2024-03-24 01:00:00");
    let large = submit!(app, "ana", 5000, "2024-03-24 13:00:00");

    let req = test::TestRequest::get().uri("/api/transactions").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<&Value> = listed.as_array().unwrap().iter().map(|t| &t["id"]).collect();
    assert_eq!(
        ids,
        vec![&large["transactionId"], &late["transactionId"], &clean["transactionId"]]
    );

    let req = test::TestRequest::get().uri("/api/transactions?limit=1").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/api/flagged-transactions").to_request();
    let flagged: Value = test::call_and_read_body_json(&app, req).await;
    let flagged = flagged.as_array().unwrap();
    assert_eq!(flagged.len(), 2);
    assert_eq!(flagged[0]["flags"], json!(["unusual_amount"]));
    assert_eq!(flagged[1]["flags"], json!(["odd_hours"]));
}

#[actix_web::test]
async fn threat_score_override() {
    let monitor = monitor();
    let app = app!(monitor);

    let created = submit!(app, "ana", 10, "2024-03-24 12:00:00");
    assert_eq!(created["alertRaised"], false);

    let req = test::TestRequest::post()
        .uri("/api/threat-score")
        .set_json(json!({"transactionId": created["transactionId"], "score": 88}))
        .to_request();
    let overridden: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(overridden["threatScore"], 88);
    assert_eq!(overridden["threatLevel"], "high");
    assert_eq!(overridden["alertRaised"], true);

    let req = test::TestRequest::get().uri("/api/transactions/suspicious").to_request();
    let suspicious: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(suspicious[0]["id"], created["transactionId"]);

    let req = test::TestRequest::get().uri("/api/alerts").to_request();
    let alerts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["threatScore"], 88);

    let req = test::TestRequest::post()
        .uri("/api/threat-score")
        .set_json(json!({"transactionId": "7d0e7e2c-0c7c-4d4e-9a43-1f1f1f1f1f1f", "score": 10}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/threat-score")
        .set_json(json!({"transactionId": created["transactionId"], "score": 150}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
