pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::MonitorResult;
use crate::models::{AlertRecord, TransactionRecord, UserProfile};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for user profiles, monitored transactions and alerts
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> MonitorResult<()>;

    async fn get_user(&self, user_id: &str) -> MonitorResult<Option<UserProfile>>;
    async fn upsert_user(&self, profile: &UserProfile) -> MonitorResult<()>;

    async fn insert_transaction(&self, txn: &TransactionRecord) -> MonitorResult<()>;
    async fn insert_alert(&self, alert: &AlertRecord) -> MonitorResult<()>;

    /// Replace the stored score; `None` when the transaction does not exist
    async fn update_threat_score(
        &self,
        id: Uuid,
        score: u8,
    ) -> MonitorResult<Option<TransactionRecord>>;

    async fn has_alert(&self, transaction_id: Uuid) -> MonitorResult<bool>;

    /// Most recent transactions first
    async fn list_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>>;

    /// Transactions with at least one fired rule, most recent first
    async fn flagged_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>>;

    async fn count_transactions(&self) -> MonitorResult<u64>;
    async fn count_alerts(&self) -> MonitorResult<u64>;

    /// Mean threat score over all transactions, 0 when there are none
    async fn average_threat_score(&self) -> MonitorResult<f64>;

    /// Transactions scoring strictly above `min_score`, highest first
    async fn suspicious_transactions(&self, min_score: u8) -> MonitorResult<Vec<TransactionRecord>>;

    /// Most recent alerts first
    async fn recent_alerts(&self, limit: i64) -> MonitorResult<Vec<AlertRecord>>;
}
