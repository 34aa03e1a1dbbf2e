//! Core types for threat engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Threat score (0-100)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ThreatScore(u8);

impl ThreatScore {
    /// Maximum score
    pub const MAX: ThreatScore = ThreatScore(100);

    /// Create new threat score, clamped to 100
    pub fn new(score: u32) -> Self {
        Self(score.min(100) as u8)
    }

    /// Get raw score
    pub fn score(&self) -> u8 {
        self.0
    }

    /// Check if high threat (>= 75)
    pub fn is_high(&self) -> bool {
        self.0 >= 75
    }

    /// Check if medium threat (50-74)
    pub fn is_medium(&self) -> bool {
        (50..75).contains(&self.0)
    }

    /// Check if low threat (< 50)
    pub fn is_low(&self) -> bool {
        self.0 < 50
    }
}

impl fmt::Display for ThreatScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Threat level band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    /// Low threat
    Low,
    /// Medium threat
    Medium,
    /// High threat
    High,
}

impl From<ThreatScore> for ThreatLevel {
    fn from(score: ThreatScore) -> Self {
        if score.is_high() {
            ThreatLevel::High
        } else if score.is_medium() {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }
}

/// Identifier of a triggered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatFlag {
    /// Amount above the configured threshold
    UnusualAmount,
    /// Location not among the user's known locations
    NewLocation,
    /// Transaction hour inside the odd-hours window
    OddHours,
    /// Device not registered for the user
    UnknownDevice,
}

impl ThreatFlag {
    /// All flags in evaluation order
    pub const ALL: [ThreatFlag; 4] = [
        ThreatFlag::UnusualAmount,
        ThreatFlag::NewLocation,
        ThreatFlag::OddHours,
        ThreatFlag::UnknownDevice,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatFlag::UnusualAmount => "unusual_amount",
            ThreatFlag::NewLocation => "new_location",
            ThreatFlag::OddHours => "odd_hours",
            ThreatFlag::UnknownDevice => "unknown_device",
        }
    }

    /// Points added when the rule fires
    pub fn weight(&self) -> u32 {
        match self {
            ThreatFlag::UnusualAmount => 30,
            ThreatFlag::NewLocation => 25,
            ThreatFlag::OddHours => 20,
            ThreatFlag::UnknownDevice => 25,
        }
    }

    /// Parse a wire identifier
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.as_str() == name)
    }
}

impl fmt::Display for ThreatFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a single transaction, as needed for scoring
///
/// `is_new_location` and `is_unknown_device` are resolved by the caller
/// against the user's profile before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAttributes {
    /// Transaction amount
    pub amount: Decimal,

    /// Location not seen before for this user
    pub is_new_location: bool,

    /// Device not registered for this user
    pub is_unknown_device: bool,

    /// Transaction instant; only the hour of day is used
    pub timestamp: String,
}

impl TransactionAttributes {
    /// Create attributes from parts
    pub fn new(
        amount: Decimal,
        is_new_location: bool,
        is_unknown_device: bool,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            is_new_location,
            is_unknown_device,
            timestamp: timestamp.into(),
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Clamped threat score
    pub score: ThreatScore,

    /// Fired rules, in evaluation order
    pub flags: Vec<ThreatFlag>,
}

impl ScoreResult {
    /// Threat level band of the score
    pub fn level(&self) -> ThreatLevel {
        ThreatLevel::from(self.score)
    }

    /// Check whether a rule fired
    pub fn has_flag(&self, flag: ThreatFlag) -> bool {
        self.flags.contains(&flag)
    }
}
