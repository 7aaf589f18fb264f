//! # Commission Change Events
//!
//! Serde mirror of the commission-history API schema, plus timestamp
//! parsing. Field names and types match the `commission_histories`
//! entries the API returns; unknown fields are ignored.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Wire format of `created_at` in history events.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// One commission-rate change observed for a validator.
///
/// Events are immutable facts; ordering and end-of-epoch squashing
/// happen downstream in the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionChangeEvent {
    /// Validator identity key (mining-beta, base-58).
    pub account: String,
    /// Epoch in which the change occurred.
    pub epoch: u64,
    /// Commission rate before the change, percent. `None` when the
    /// API has no prior observation for this validator.
    pub commission_before: Option<f64>,
    /// Commission rate after the change, percent.
    pub commission_after: f64,
    /// Observation timestamp, ISO8601 with fractional seconds.
    pub created_at: String,
    /// Fraction of the epoch elapsed when the change was observed.
    pub epoch_completion: f64,
}

/// Parses an event's `created_at` string into a structured timestamp.
///
/// ## Errors
///
/// Returns `AuditError::Decode` when the string does not match
/// [`CREATED_AT_FORMAT`]. Event ordering inside an epoch depends on
/// these timestamps, so a malformed one aborts the run.
pub fn parse_created_at(raw: &str) -> Result<NaiveDateTime, AuditError> {
    NaiveDateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .map_err(|e| AuditError::Decode(format!("malformed created_at '{}': {}", raw, e)))
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
