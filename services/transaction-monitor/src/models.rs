use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use threat_engine::{ThreatFlag, ThreatLevel};
use uuid::Uuid;
use validator::Validate;

// ===== User Profile =====
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub known_locations: Vec<String>,
    pub devices: Vec<String>,
}

impl UserProfile {
    pub fn knows_location(&self, location: &str) -> bool {
        self.known_locations.iter().any(|l| l == location)
    }

    pub fn knows_device(&self, device: &str) -> bool {
        self.devices.iter().any(|d| d == device)
    }
}

// ===== Stored Transaction =====
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub location: String,
    pub device: String,
    pub timestamp: DateTime<Utc>,
    pub threat_score: u8,
    pub flags: Vec<ThreatFlag>,
    pub created_at: DateTime<Utc>,
}

// ===== Stored Alert =====
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Uuid,
    pub user_id: String,
    pub transaction_id: Uuid,
    pub alert_message: String,
    pub threat_score: u8,
    pub timestamp: DateTime<Utc>,
}

// ===== Monitor Request =====
#[derive(Debug, Deserialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MonitorTransactionRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    pub amount: Decimal,
    #[validate(length(max = 256))]
    pub location: String,
    #[validate(length(max = 256))]
    pub device: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorTransactionResponse {
    pub message: String,
    pub transaction_id: Uuid,
    pub threat_score: u8,
    pub threat_level: ThreatLevel,
    pub flags: Vec<ThreatFlag>,
    pub alert_raised: bool,
}

// ===== Transaction Listing =====
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

// ===== Threat Score Override =====
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ThreatScoreOverrideRequest {
    pub transaction_id: Uuid,
    #[validate(range(max = 100))]
    pub score: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatScoreOverrideResponse {
    pub transaction_id: Uuid,
    pub threat_score: u8,
    pub threat_level: ThreatLevel,
    pub alert_raised: bool,
}

// ===== Dashboard =====
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub high_risk_alerts_count: u64,
    pub total_transactions_monitored: u64,
    pub average_threat_score: f64,
}

// ===== Device Verification =====
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDeviceRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    pub device: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDeviceResponse {
    pub is_known_device: bool,
}

// ===== Profile Upsert =====
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserRequest {
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub known_locations: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub devices: Vec<String>,
}

// ===== Health Check =====
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_request_camel_case() {
        let req: MonitorTransactionRequest = serde_json::from_value(serde_json::json!({
            "userId": "u-1",
            "amount": 5000,
            "location": "Dubai, UAE",
            "device": "iphone-15",
            "timestamp": "2024-03-24 10:45:33"
        }))
        .unwrap();

        assert_eq!(req.user_id, "u-1");
        assert_eq!(req.amount, Decimal::from(5_000));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_override_score_range() {
        let req = ThreatScoreOverrideRequest {
            transaction_id: Uuid::new_v4(),
            score: 101,
        };
        assert!(req.validate().is_err());

        let req = ThreatScoreOverrideRequest {
            transaction_id: Uuid::new_v4(),
            score: 100,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_user_id_invalid() {
        let req = VerifyDeviceRequest {
            user_id: String::new(),
            device: "d".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_profile_lookup() {
        let profile = UserProfile {
            user_id: "u-1".into(),
            known_locations: vec!["London, UK".into()],
            devices: vec!["pixel-8".into()],
        };
        assert!(profile.knows_location("London, UK"));
        assert!(!profile.knows_location("london, uk"));
        assert!(profile.knows_device("pixel-8"));
        assert!(!profile.knows_device("unknown"));
    }
}
