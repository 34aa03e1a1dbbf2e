use super::MonitorStore;
use crate::database;
use crate::errors::MonitorResult;
use crate::models::{AlertRecord, TransactionRecord, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use threat_engine::ThreatFlag;
use tracing::warn;
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> MonitorResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserProfileRow {
    user_id: String,
    known_locations: Vec<String>,
    devices: Vec<String>,
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    amount: Decimal,
    location: String,
    device: String,
    occurred_at: DateTime<Utc>,
    threat_score: i16,
    flags: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    user_id: String,
    transaction_id: Uuid,
    alert_message: String,
    threat_score: i16,
    created_at: DateTime<Utc>,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        UserProfile {
            user_id: row.user_id,
            known_locations: row.known_locations,
            devices: row.devices,
        }
    }
}

impl From<TransactionRow> for TransactionRecord {
    fn from(row: TransactionRow) -> Self {
        let flags = row
            .flags
            .iter()
            .filter_map(|name| {
                let flag = ThreatFlag::from_name(name);
                if flag.is_none() {
                    warn!("Ignoring unknown flag '{}' on transaction {}", name, row.id);
                }
                flag
            })
            .collect();

        TransactionRecord {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            location: row.location,
            device: row.device,
            timestamp: row.occurred_at,
            threat_score: score_from_db(row.threat_score),
            flags,
            created_at: row.created_at,
        }
    }
}

impl From<AlertRow> for AlertRecord {
    fn from(row: AlertRow) -> Self {
        AlertRecord {
            id: row.id,
            user_id: row.user_id,
            transaction_id: row.transaction_id,
            alert_message: row.alert_message,
            threat_score: score_from_db(row.threat_score),
            timestamp: row.created_at,
        }
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, location, device, occurred_at, threat_score, flags, created_at";

fn score_from_db(score: i16) -> u8 {
    score.clamp(0, 100) as u8
}

#[async_trait]
impl MonitorStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> MonitorResult<()> {
        database::health_check(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> MonitorResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            "SELECT user_id, known_locations, devices FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn upsert_user(&self, profile: &UserProfile) -> MonitorResult<()> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, known_locations, devices, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (user_id) DO UPDATE
             SET known_locations = $2, devices = $3, updated_at = NOW()",
        )
        .bind(&profile.user_id)
        .bind(&profile.known_locations)
        .bind(&profile.devices)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_transaction(&self, txn: &TransactionRecord) -> MonitorResult<()> {
        let flags: Vec<&str> = txn.flags.iter().map(ThreatFlag::as_str).collect();

        sqlx::query(
            "INSERT INTO monitored_transactions
                (id, user_id, amount, location, device, occurred_at, threat_score, flags, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(txn.id)
        .bind(&txn.user_id)
        .bind(txn.amount)
        .bind(&txn.location)
        .bind(&txn.device)
        .bind(txn.timestamp)
        .bind(i16::from(txn.threat_score))
        .bind(&flags)
        .bind(txn.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertRecord) -> MonitorResult<()> {
        sqlx::query(
            "INSERT INTO alerts (id, user_id, transaction_id, alert_message, threat_score, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(alert.id)
        .bind(&alert.user_id)
        .bind(alert.transaction_id)
        .bind(&alert.alert_message)
        .bind(i16::from(alert.threat_score))
        .bind(alert.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_threat_score(
        &self,
        id: Uuid,
        score: u8,
    ) -> MonitorResult<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "UPDATE monitored_transactions SET threat_score = $2 WHERE id = $1 RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(i16::from(score))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TransactionRecord::from))
    }

    async fn has_alert(&self, transaction_id: Uuid) -> MonitorResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM alerts WHERE transaction_id = $1)")
                .bind(transaction_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM monitored_transactions
             ORDER BY created_at DESC
             LIMIT $1",
            TRANSACTION_COLUMNS
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    async fn flagged_transactions(&self, limit: i64) -> MonitorResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM monitored_transactions
             WHERE cardinality(flags) > 0
             ORDER BY created_at DESC
             LIMIT $1",
            TRANSACTION_COLUMNS
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    async fn count_transactions(&self) -> MonitorResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM monitored_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_alerts(&self) -> MonitorResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn average_threat_score(&self) -> MonitorResult<f64> {
        let avg: Option<f64> = sqlx::query_scalar(
            "SELECT CAST(AVG(threat_score) AS DOUBLE PRECISION) FROM monitored_transactions",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(avg.unwrap_or(0.0))
    }

    async fn suspicious_transactions(&self, min_score: u8) -> MonitorResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM monitored_transactions
             WHERE threat_score > $1
             ORDER BY threat_score DESC, created_at DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(i16::from(min_score))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    async fn recent_alerts(&self, limit: i64) -> MonitorResult<Vec<AlertRecord>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT id, user_id, transaction_id, alert_message, threat_score, created_at
             FROM alerts
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertRecord::from).collect())
    }
}
