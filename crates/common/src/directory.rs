//! # Validator Directory
//!
//! Maps validator identity keys to vote keys from a directory snapshot.
//! Records missing either key are skipped without error; the directory
//! lists candidates and inactive validators whose metadata can be
//! incomplete.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One validator record from the directory snapshot. Only the two key
/// fields matter here; everything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Validator identity key (mining-beta, base-58).
    #[serde(default)]
    pub account: Option<String>,
    /// Validator vote key (base-58).
    #[serde(default)]
    pub vote_account: Option<String>,
}

/// Builds the identity → vote-key map from a directory snapshot.
/// One entry per record carrying both keys.
pub fn build_identity_to_vote_key_map(
    validators: &[ValidatorRecord],
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for record in validators {
        if let (Some(account), Some(vote_account)) = (&record.account, &record.vote_account) {
            map.insert(account.clone(), vote_account.clone());
        }
    }
    map
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
