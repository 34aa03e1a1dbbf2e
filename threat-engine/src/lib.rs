//! Threat Engine for Bank Guardian
//!
//! Rule-based threat scoring for monitored card and account transactions.
//!
//! # Rules
//!
//! - **Unusual amount**: amount above the configured threshold (+30)
//! - **New location**: transaction from a location the user has not used (+25)
//! - **Odd hours**: transaction hour inside the nightly window (+20)
//! - **Unknown device**: transaction from an unregistered device (+25)
//!
//! Scores are clamped to 100. Evaluation is pure and may be called
//! concurrently from any number of threads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rules;
pub mod scoring;
pub mod types;

pub use error::{Error, Result};
pub use rules::RuleConfig;
pub use scoring::{evaluate, parse_instant, parse_timestamp, ThreatEvaluator};
pub use types::*;
