pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod monitor;
pub mod store;

// Re-exports for convenience
pub use monitor::{MonitorOutcome, TransactionMonitor};
pub use store::{MemoryStore, MonitorStore, PgStore};
