//! Rule thresholds

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rule configuration
///
/// Fields are private so that every instance has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConfig {
    amount_threshold: Decimal,
    odd_hours_start: u32,
    odd_hours_end: u32,
    check_location_change: bool,
    check_unknown_device: bool,
}

impl RuleConfig {
    /// Create a validated rule configuration
    pub fn new(
        amount_threshold: Decimal,
        odd_hours_start: u32,
        odd_hours_end: u32,
        check_location_change: bool,
        check_unknown_device: bool,
    ) -> Result<Self> {
        if amount_threshold.is_sign_negative() {
            return Err(Error::InvalidConfig(format!(
                "amount threshold {} must not be negative",
                amount_threshold
            )));
        }

        for (name, hour) in [("start", odd_hours_start), ("end", odd_hours_end)] {
            if hour > 23 {
                return Err(Error::InvalidConfig(format!(
                    "odd hours {} {} outside 0-23",
                    name, hour
                )));
            }
        }

        Ok(Self {
            amount_threshold,
            odd_hours_start,
            odd_hours_end,
            check_location_change,
            check_unknown_device,
        })
    }

    /// Amount above which `unusual_amount` fires
    pub fn amount_threshold(&self) -> Decimal {
        self.amount_threshold
    }

    /// First hour of the odd-hours window
    pub fn odd_hours_start(&self) -> u32 {
        self.odd_hours_start
    }

    /// Last hour of the odd-hours window
    pub fn odd_hours_end(&self) -> u32 {
        self.odd_hours_end
    }

    /// Whether the new-location rule is active
    pub fn check_location_change(&self) -> bool {
        self.check_location_change
    }

    /// Whether the unknown-device rule is active
    pub fn check_unknown_device(&self) -> bool {
        self.check_unknown_device
    }

    /// Whether `hour` falls in the odd-hours window (inclusive on both ends)
    ///
    /// The test is `hour >= start || hour <= end`, so a window with
    /// `start <= end` covers every hour outside `(end, start)`.
    pub fn is_odd_hour(&self, hour: u32) -> bool {
        hour >= self.odd_hours_start || hour <= self.odd_hours_end
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            amount_threshold: Decimal::from(1_000),
            odd_hours_start: 23,
            odd_hours_end: 5,
            check_location_change: true,
            check_unknown_device: true,
        }
    }
}

#[derive(Deserialize)]
struct RawRuleConfig {
    amount_threshold: Decimal,
    odd_hours_start: u32,
    odd_hours_end: u32,
    #[serde(default = "enabled")]
    check_location_change: bool,
    #[serde(default = "enabled")]
    check_unknown_device: bool,
}

fn enabled() -> bool {
    true
}

impl<'de> Deserialize<'de> for RuleConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawRuleConfig::deserialize(deserializer)?;
        RuleConfig::new(
            raw.amount_threshold,
            raw.odd_hours_start,
            raw.odd_hours_end,
            raw.check_location_change,
            raw.check_unknown_device,
        )
        .map_err(serde::de::Error::custom)
    }
}
