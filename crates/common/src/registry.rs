//! # Participant Registry
//!
//! Decodes raw delegation-program account records into participants and
//! exposes the approved-identity set.
//!
//! ## Record Layout
//!
//! Fixed 65-byte prefix, decoded with bounds checks:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | `[0..32)` | testnet identity key |
//! | `[32..64)` | mining-beta identity key |
//! | `[64]` | approval state code (1 = pending, 2 = rejected, 3 = approved) |
//!
//! Keys are rendered as base-58 strings of the raw 32 bytes. A buffer
//! shorter than 65 bytes is a decode error: the run aborts rather than
//! producing silently wrong fields. Records with an unknown state code
//! are skipped.
//!
//! ## Invariant
//!
//! Exactly one participant per mining-beta key; when the program holds
//! duplicate records for a key, the last decoded record wins.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::AuditError;

/// Byte range of the testnet identity key within a record.
const TESTNET_KEY_RANGE: std::ops::Range<usize> = 0..32;

/// Byte range of the mining-beta identity key within a record.
const MB_KEY_RANGE: std::ops::Range<usize> = 32..64;

/// Offset of the approval state code within a record.
const STATE_CODE_OFFSET: usize = 64;

/// Minimum record length covering all three fields.
const RECORD_MIN_LEN: usize = 65;

// ════════════════════════════════════════════════════════════════════════════
// PARTICIPANT
// ════════════════════════════════════════════════════════════════════════════

/// Approval state of a delegation-program participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    /// Application received, not yet decided.
    Pending,
    /// Application rejected.
    Rejected,
    /// Participant admitted to the program.
    Approved,
}

impl ParticipantState {
    /// Maps an on-chain state code to a state.
    ///
    /// Returns `None` for codes outside `{1, 2, 3}`; such records are
    /// not part of the registry.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ParticipantState::Pending),
            2 => Some(ParticipantState::Rejected),
            3 => Some(ParticipantState::Approved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantState::Pending => write!(f, "pending"),
            ParticipantState::Rejected => write!(f, "rejected"),
            ParticipantState::Approved => write!(f, "approved"),
        }
    }
}

/// A delegation-program participant, immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Mining-beta identity key, base-58.
    pub mb_pubkey: String,
    /// Testnet identity key, base-58.
    pub testnet_pubkey: String,
    /// Raw on-chain state code.
    pub state_code: u8,
    /// Decoded approval state.
    pub state: ParticipantState,
}

// ════════════════════════════════════════════════════════════════════════════
// DECODING
// ════════════════════════════════════════════════════════════════════════════

/// Decodes raw program-account records into a participant registry,
/// keyed by mining-beta identity key.
///
/// ## Errors
///
/// Returns `AuditError::Decode` when any buffer is shorter than the
/// 65-byte record prefix. Partial records cannot be attributed to a
/// validator and poison the whole registry, so decoding fails fast.
pub fn decode_participants(
    raw_records: &[Vec<u8>],
) -> Result<HashMap<String, Participant>, AuditError> {
    let mut registry: HashMap<String, Participant> = HashMap::new();

    for (idx, data) in raw_records.iter().enumerate() {
        if data.len() < RECORD_MIN_LEN {
            return Err(AuditError::Decode(format!(
                "program account record {} is {} bytes, need at least {}",
                idx,
                data.len(),
                RECORD_MIN_LEN,
            )));
        }

        let state_code = data[STATE_CODE_OFFSET];
        let Some(state) = ParticipantState::from_code(state_code) else {
            debug!(record = idx, code = state_code, "skipping record with unknown state code");
            continue;
        };

        let testnet_pubkey = bs58::encode(&data[TESTNET_KEY_RANGE]).into_string();
        let mb_pubkey = bs58::encode(&data[MB_KEY_RANGE]).into_string();

        // Last write wins on duplicate mining-beta keys.
        registry.insert(
            mb_pubkey.clone(),
            Participant {
                mb_pubkey,
                testnet_pubkey,
                state_code,
                state,
            },
        );
    }

    Ok(registry)
}

/// Returns the mining-beta keys of all approved participants.
pub fn approved_set(registry: &HashMap<String, Participant>) -> HashSet<String> {
    registry
        .values()
        .filter(|p| p.state == ParticipantState::Approved)
        .map(|p| p.mb_pubkey.clone())
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
