use super::MonitorStore;
use crate::errors::MonitorResult;
use crate::models::{AlertRecord, TransactionRecord, UserProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process store; contents are lost on restart
#[derive(Default, Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, UserProfile>>>,
    transactions: Arc<RwLock<Vec<TransactionRecord>>>,
    alerts: Arc<RwLock<Vec<AlertRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> MonitorResult<()> {
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> MonitorResult<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> MonitorResult<()> {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_transaction(&self, txn: &TransactionRecord) -> MonitorResult<()> {
        self.transactions.write().await.push(txn.clone());
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertRecord) -> MonitorResult<()> {
        self.alerts.write().await.push(alert.clone());
        Ok(())
    }

    async fn update_threat_score(
        &self,
        id: Uuid,
        score: u8,
    ) -> MonitorResult<Option<TransactionRecord>> {
        let mut transactions = self.transactions.write().await;
        Ok(transactions.iter_mut().find(|t| t.id == id).map(|t| {
            t.threat_score = score;
            t.clone()
        }))
    }

    async fn has_alert(&self, transaction_id: Uuid) -> MonitorResult<bool> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .any(|a| a.transaction_id == transaction_id))
    }

    // Insertion order is creation order
    async fn list_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let transactions = self.transactions.read().await;

        Ok(transactions.iter().rev().take(limit).cloned().collect())
    }

    async fn flagged_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let transactions = self.transactions.read().await;

        Ok(transactions
            .iter()
            .rev()
            .filter(|t| !t.flags.is_empty())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_transactions(&self) -> MonitorResult<u64> {
        Ok(self.transactions.read().await.len() as u64)
    }

    async fn count_alerts(&self) -> MonitorResult<u64> {
        Ok(self.alerts.read().await.len() as u64)
    }

    async fn average_threat_score(&self) -> MonitorResult<f64> {
        let transactions = self.transactions.read().await;
        if transactions.is_empty() {
            return Ok(0.0);
        }

        let total: f64 = transactions.iter().map(|t| f64::from(t.threat_score)).sum();
        Ok(total / transactions.len() as f64)
    }

    async fn suspicious_transactions(&self, min_score: u8) -> MonitorResult<Vec<TransactionRecord>> {
        let mut suspicious: Vec<TransactionRecord> = self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.threat_score > min_score)
            .cloned()
            .collect();

        suspicious.sort_by(|a, b| {
            b.threat_score
                .cmp(&a.threat_score)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(suspicious)
    }

    async fn recent_alerts(&self, limit: i64) -> MonitorResult<Vec<AlertRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let alerts = self.alerts.read().await;

        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }
}
