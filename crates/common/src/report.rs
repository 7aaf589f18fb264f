//! # Violation Report
//!
//! Renders detected violations as delimited text lines, one per
//! violation:
//!
//! ```text
//! identity,vote_key,timestamp,commission_before,commission_after,epoch,epoch_completion
//! ```
//!
//! The vote key comes from the directory map; an identity without a
//! directory entry is a hard error: the line cannot be produced and
//! the mismatch is surfaced instead of guessed around.

use std::collections::HashMap;

use crate::detector::Violation;
use crate::error::AuditError;

/// Timestamp layout in report lines.
const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Renders violations as CSV lines using the identity → vote-key map.
///
/// A missing prior rate renders as an empty field so the line stays
/// machine-parseable.
///
/// ## Errors
///
/// Returns `AuditError::MissingMapping` when a violating identity is
/// absent from the map.
pub fn render_csv(
    violations: &[Violation],
    vote_key_map: &HashMap<String, String>,
) -> Result<Vec<String>, AuditError> {
    let mut lines = Vec::with_capacity(violations.len());

    for violation in violations {
        let vote_key = vote_key_map
            .get(&violation.account)
            .ok_or_else(|| AuditError::MissingMapping {
                identity: violation.account.clone(),
            })?;

        let before = violation
            .event
            .commission_before
            .map(|b| b.to_string())
            .unwrap_or_default();

        lines.push(format!(
            "{},{},{},{},{},{},{}",
            violation.account,
            vote_key,
            violation.occurred_at.format(REPORT_TIMESTAMP_FORMAT),
            before,
            violation.event.commission_after,
            violation.epoch,
            violation.event.epoch_completion,
        ));
    }

    Ok(lines)
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
