use crate::config::AlertConfig;
use crate::errors::{MonitorError, MonitorResult};
use crate::metrics;
use crate::models::*;
use crate::store::MonitorStore;
use chrono::Utc;
use std::sync::Arc;
use threat_engine::{ScoreResult, ThreatEvaluator, ThreatLevel, ThreatScore, TransactionAttributes};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Result of monitoring one transaction
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub transaction: TransactionRecord,
    pub result: ScoreResult,
    pub alert: Option<AlertRecord>,
}

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

/// Scores incoming transactions, records them and raises alerts
pub struct TransactionMonitor {
    evaluator: ThreatEvaluator,
    store: Arc<dyn MonitorStore>,
    alerts: AlertConfig,
}

impl TransactionMonitor {
    pub fn new(evaluator: ThreatEvaluator, store: Arc<dyn MonitorStore>, alerts: AlertConfig) -> Self {
        Self {
            evaluator,
            store,
            alerts,
        }
    }

    pub fn store(&self) -> &Arc<dyn MonitorStore> {
        &self.store
    }

    pub async fn monitor(&self, req: MonitorTransactionRequest) -> MonitorResult<MonitorOutcome> {
        req.validate()?;
        if req.amount.is_sign_negative() {
            return Err(MonitorError::Validation(format!(
                "amount {} must not be negative",
                req.amount
            )));
        }

        let timestamp = threat_engine::parse_instant(&req.timestamp)?.with_timezone(&Utc);

        // Users without a profile have no known locations or devices
        let profile = self.store.get_user(&req.user_id).await?;
        let (is_new_location, is_unknown_device) = match &profile {
            Some(p) => (!p.knows_location(&req.location), !p.knows_device(&req.device)),
            None => (true, true),
        };

        let attributes =
            TransactionAttributes::new(req.amount, is_new_location, is_unknown_device, &req.timestamp);
        let result = self.evaluator.evaluate(&attributes)?;

        let transaction = TransactionRecord {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            amount: req.amount,
            location: req.location,
            device: req.device,
            timestamp,
            threat_score: result.score.score(),
            flags: result.flags.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_transaction(&transaction).await?;

        let alert = if self.exceeds_threshold(transaction.threat_score) {
            Some(self.raise_alert(&transaction).await?)
        } else {
            None
        };

        metrics::record_evaluation(&result, alert.is_some());

        info!(
            "Transaction {} monitored: score {} flags {:?}",
            transaction.id, result.score, result.flags
        );

        Ok(MonitorOutcome {
            transaction,
            result,
            alert,
        })
    }

    /// Replace a transaction's score, raising an alert if it now crosses the
    /// threshold and none exists yet
    pub async fn override_threat_score(
        &self,
        req: ThreatScoreOverrideRequest,
    ) -> MonitorResult<ThreatScoreOverrideResponse> {
        req.validate()?;

        let transaction = self
            .store
            .update_threat_score(req.transaction_id, req.score)
            .await?
            .ok_or(MonitorError::TransactionNotFound(req.transaction_id))?;

        let alert_raised = self.exceeds_threshold(transaction.threat_score)
            && !self.store.has_alert(transaction.id).await?;
        if alert_raised {
            self.raise_alert(&transaction).await?;
        }

        metrics::record_override(alert_raised);
        info!(
            "Threat score of transaction {} set to {}",
            transaction.id, transaction.threat_score
        );

        Ok(ThreatScoreOverrideResponse {
            transaction_id: transaction.id,
            threat_score: transaction.threat_score,
            threat_level: ThreatLevel::from(ThreatScore::new(u32::from(transaction.threat_score))),
            alert_raised,
        })
    }

    pub async fn list_transactions(&self, limit: Option<i64>) -> MonitorResult<Vec<TransactionRecord>> {
        self.store.list_transactions(list_limit(limit)).await
    }

    pub async fn flagged_transactions(&self, limit: Option<i64>) -> MonitorResult<Vec<TransactionRecord>> {
        self.store.flagged_transactions(list_limit(limit)).await
    }

    pub async fn dashboard_summary(&self) -> MonitorResult<DashboardSummary> {
        Ok(DashboardSummary {
            high_risk_alerts_count: self.store.count_alerts().await?,
            total_transactions_monitored: self.store.count_transactions().await?,
            average_threat_score: self.store.average_threat_score().await?,
        })
    }

    pub async fn suspicious_transactions(&self) -> MonitorResult<Vec<TransactionRecord>> {
        self.store.suspicious_transactions(self.alerts.threshold).await
    }

    pub async fn recent_alerts(&self) -> MonitorResult<Vec<AlertRecord>> {
        self.store.recent_alerts(self.alerts.recent_limit).await
    }

    pub async fn user_locations(&self, user_id: &str) -> MonitorResult<Vec<String>> {
        Ok(self.require_user(user_id).await?.known_locations)
    }

    pub async fn verify_device(&self, req: VerifyDeviceRequest) -> MonitorResult<bool> {
        req.validate()?;
        let profile = self.require_user(&req.user_id).await?;
        Ok(profile.knows_device(&req.device))
    }

    pub async fn upsert_user(&self, user_id: String, req: UpsertUserRequest) -> MonitorResult<UserProfile> {
        req.validate()?;
        if user_id.trim().is_empty() {
            return Err(MonitorError::Validation("userId must not be empty".to_string()));
        }

        let mut known_locations = req.known_locations;
        known_locations.sort();
        known_locations.dedup();
        let mut devices = req.devices;
        devices.sort();
        devices.dedup();

        let profile = UserProfile {
            user_id,
            known_locations,
            devices,
        };
        self.store.upsert_user(&profile).await?;

        info!("Profile stored for user {}", profile.user_id);
        Ok(profile)
    }

    async fn require_user(&self, user_id: &str) -> MonitorResult<UserProfile> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| MonitorError::UserNotFound(user_id.to_string()))
    }

    fn exceeds_threshold(&self, score: u8) -> bool {
        score > self.alerts.threshold
    }

    async fn raise_alert(&self, transaction: &TransactionRecord) -> MonitorResult<AlertRecord> {
        let alert = AlertRecord {
            id: Uuid::new_v4(),
            user_id: transaction.user_id.clone(),
            transaction_id: transaction.id,
            alert_message: self.alerts.message.clone(),
            threat_score: transaction.threat_score,
            timestamp: Utc::now(),
        };
        self.store.insert_alert(&alert).await?;

        warn!(
            user_id = %alert.user_id,
            transaction_id = %alert.transaction_id,
            score = alert.threat_score,
            "High threat transaction"
        );
        Ok(alert)
    }
}

fn list_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
