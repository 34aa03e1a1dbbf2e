use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use threat_engine::ThreatEvaluator;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transaction_monitor::{
    config::{Config, StorageBackend},
    database,
    handlers::{self, MetricsRegistry, StartedAt},
    metrics,
    middleware::RateLimiter,
    MemoryStore, MonitorStore, PgStore, TransactionMonitor,
};

fn startup_error(msg: String) -> std::io::Error {
    error!("{}", msg);
    std::io::Error::new(std::io::ErrorKind::Other, msg)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting Transaction Monitor...");

    // Load configuration
    let config = Config::from_env()
        .map_err(|e| startup_error(format!("Failed to load configuration: {}", e)))?;
    let rules = config
        .rules
        .to_rules()
        .map_err(|e| startup_error(format!("Invalid rule configuration: {}", e)))?;
    info!(
        amount_threshold = %rules.amount_threshold(),
        odd_hours_start = rules.odd_hours_start(),
        odd_hours_end = rules.odd_hours_end(),
        "Configuration loaded successfully"
    );

    let store: Arc<dyn MonitorStore> = match config.database.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database at {}", config.database.url);
            let pool = database::create_pool(&config.database)
                .await
                .map_err(|e| startup_error(format!("Database connection failed: {}", e)))?;

            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .map_err(|e| startup_error(format!("Database migration failed: {}", e)))?;
            info!("Database migrations applied");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is not persisted");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = store.health_check().await {
        return Err(startup_error(format!("Storage health check failed: {}", e)));
    }
    info!("Storage health check passed");

    let registry = Registry::new();
    metrics::register_metrics(&registry)
        .map_err(|e| startup_error(format!("Metrics registration failed: {}", e)))?;
    metrics::init_flag_series();

    let monitor = Arc::new(TransactionMonitor::new(
        ThreatEvaluator::new(rules),
        store,
        config.alerts.clone(),
    ));
    let registry = web::Data::new(MetricsRegistry(registry));
    let started = web::Data::new(StartedAt(Instant::now()));
    let rate_limiter = RateLimiter::new(config.rate_limit.requests_per_minute);

    let server_config = config.server.clone();

    info!(
        "Starting HTTP server on {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(monitor.clone()))
            .app_data(registry.clone())
            .app_data(started.clone())
            .wrap(rate_limiter.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(server_config.workers)
    .bind((server_config.host, server_config.port))?
    .run()
    .await
}
