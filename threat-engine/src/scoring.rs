//! Threat scoring engine

use crate::{
    Error, Result, RuleConfig, ScoreResult, ThreatFlag, ThreatScore, TransactionAttributes,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use tracing::debug;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Threat evaluator
///
/// Owns an immutable [`RuleConfig`]; share it behind an `Arc` across workers.
#[derive(Debug, Clone, Default)]
pub struct ThreatEvaluator {
    rules: RuleConfig,
}

impl ThreatEvaluator {
    /// Create new evaluator
    pub fn new(rules: RuleConfig) -> Self {
        Self { rules }
    }

    /// Active rule configuration
    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Score a transaction
    pub fn evaluate(&self, txn: &TransactionAttributes) -> Result<ScoreResult> {
        evaluate(&self.rules, txn)
    }
}

/// Score a transaction against `rules`
///
/// Fails with [`Error::InvalidInput`] only when the timestamp has no
/// recognisable hour.
pub fn evaluate(rules: &RuleConfig, txn: &TransactionAttributes) -> Result<ScoreResult> {
    let hour = transaction_hour(&txn.timestamp)?;

    let checks = [
        (ThreatFlag::UnusualAmount, txn.amount > rules.amount_threshold()),
        (
            ThreatFlag::NewLocation,
            rules.check_location_change() && txn.is_new_location,
        ),
        (ThreatFlag::OddHours, rules.is_odd_hour(hour)),
        (
            ThreatFlag::UnknownDevice,
            rules.check_unknown_device() && txn.is_unknown_device,
        ),
    ];

    let flags: Vec<ThreatFlag> = checks
        .into_iter()
        .filter_map(|(flag, fired)| fired.then_some(flag))
        .collect();

    let score = ThreatScore::new(flags.iter().map(ThreatFlag::weight).sum());

    debug!(score = score.score(), ?flags, hour, "transaction evaluated");

    Ok(ScoreResult { score, flags })
}

/// Parse a transaction timestamp
///
/// RFC 3339 values keep their offset; naive `YYYY-MM-DD HH:MM:SS` values are
/// taken as written.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| Error::InvalidInput(format!("unparseable timestamp '{}'", raw)))
}

/// Parse a transaction timestamp into an absolute instant
///
/// RFC 3339 values keep their offset. Naive values carry no offset and are
/// read as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }

    let naive = parse_timestamp(raw)?;
    Ok(Utc.from_utc_datetime(&naive).fixed_offset())
}

fn transaction_hour(raw: &str) -> Result<u32> {
    parse_timestamp(raw).map(|dt| dt.hour())
}
