//! # Commission Auditor
//!
//! The analytical core: correlates the approved-participant set with
//! the commission-change history and flags validators whose settled
//! end-of-epoch commission breached the program ceiling.
//!
//! ## Pipeline (Fixed Order)
//!
//! 1. **Select candidates**: events of approved validators whose new
//!    rate exceeds the ceiling and whose prior rate is known. A missing
//!    prior rate means the API had no real observation to compare
//!    against; such events are excluded to avoid false positives.
//! 2. **Expand to full history**: every event (compliant or not) of the
//!    candidate accounts, so a later rate cut inside the same epoch is
//!    visible when the end-of-epoch state is determined.
//! 3. **Group and order**: arena of events per account per epoch,
//!    sorted ascending by observation timestamp. Ties keep their
//!    original relative order (stable sort).
//! 4. **Classify**: the last event of each group is the authoritative
//!    end-of-epoch state. A violation requires the truncated rate to
//!    exceed the ceiling AND the epoch to be settled (strictly before
//!    the current epoch); the in-progress epoch may still change before
//!    the boundary.
//!
//! A validator whose current rate is back at or below the ceiling is
//! still reported for earlier settled epochs it breached in.
//!
//! ## Properties
//!
//! - **Deterministic**: same inputs always produce the same violations,
//!   in the same order (account first-seen order, then epoch first-seen
//!   order, never globally re-sorted).
//! - **Stateless**: no mutable state between `audit()` calls, no I/O.
//! - **Pure**: no system clock, no randomness; the current epoch is
//!   caller-provided.
//! - **Safe**: no panic, no unwrap, no silent failure.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::commission::{parse_created_at, CommissionChangeEvent};
use crate::config::COMMISSION_CEILING_PCT;
use crate::error::AuditError;

// ════════════════════════════════════════════════════════════════════════════
// SPIKE POLICY
// ════════════════════════════════════════════════════════════════════════════

/// How to treat a rate spike that is corrected before the epoch ends.
///
/// Whether such a spike should count against the validator is a policy
/// question, not a detection question, so both behaviors are explicit
/// and caller-selected; neither is the silent default of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpikePolicy {
    /// Only the authoritative end-of-epoch state decides. A spike that
    /// self-corrects within the epoch does not count.
    #[default]
    FinalStateOnly,
    /// Any ceiling breach inside a settled epoch counts, even when the
    /// end-of-epoch state is compliant. The reported evidence is the
    /// latest breaching event of that epoch.
    CountIntraEpochSpikes,
}

// ════════════════════════════════════════════════════════════════════════════
// VIOLATION
// ════════════════════════════════════════════════════════════════════════════

/// One detected violation: a validator, a settled epoch, and the event
/// that evidences the breach.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Validator identity key (mining-beta, base-58).
    pub account: String,
    /// The settled epoch in which the breach stood.
    pub epoch: u64,
    /// Parsed timestamp of the evidencing event.
    pub occurred_at: NaiveDateTime,
    /// The evidencing commission-change event.
    pub event: CommissionChangeEvent,
}

// ════════════════════════════════════════════════════════════════════════════
// EPOCH LEDGER
// ════════════════════════════════════════════════════════════════════════════

/// An event with its parsed observation timestamp.
#[derive(Debug, Clone)]
struct OrderedEvent {
    occurred_at: NaiveDateTime,
    event: CommissionChangeEvent,
}

/// Events of one validator within one epoch, timestamp-ascending.
/// The last entry is the authoritative end-of-epoch commission state.
#[derive(Debug, Clone)]
struct EpochGroup {
    epoch: u64,
    events: Vec<OrderedEvent>,
}

/// Per-account event groups in epoch first-seen order.
#[derive(Debug, Clone)]
struct AccountHistory {
    account: String,
    groups: Vec<EpochGroup>,
    by_epoch: HashMap<u64, usize>,
}

/// Arena of events indexed account → epoch → ordered list, preserving
/// first-seen order on both levels.
#[derive(Debug, Clone, Default)]
struct EpochLedger {
    accounts: Vec<AccountHistory>,
    by_account: HashMap<String, usize>,
}

impl EpochLedger {
    /// Builds the ledger from an event sequence, parsing timestamps and
    /// sorting each (account, epoch) group ascending. The sort is
    /// stable: events with equal timestamps keep their input order.
    fn build(events: &[&CommissionChangeEvent]) -> Result<Self, AuditError> {
        let mut ledger = EpochLedger::default();

        for event in events {
            let occurred_at = parse_created_at(&event.created_at)?;

            let account_idx = match ledger.by_account.get(&event.account) {
                Some(&idx) => idx,
                None => {
                    ledger.accounts.push(AccountHistory {
                        account: event.account.clone(),
                        groups: Vec::new(),
                        by_epoch: HashMap::new(),
                    });
                    let idx = ledger.accounts.len() - 1;
                    ledger.by_account.insert(event.account.clone(), idx);
                    idx
                }
            };

            let history = &mut ledger.accounts[account_idx];
            let group_idx = match history.by_epoch.get(&event.epoch) {
                Some(&idx) => idx,
                None => {
                    history.groups.push(EpochGroup {
                        epoch: event.epoch,
                        events: Vec::new(),
                    });
                    let idx = history.groups.len() - 1;
                    history.by_epoch.insert(event.epoch, idx);
                    idx
                }
            };

            history.groups[group_idx].events.push(OrderedEvent {
                occurred_at,
                event: (*event).clone(),
            });
        }

        for history in &mut ledger.accounts {
            for group in &mut history.groups {
                group.events.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
            }
        }

        Ok(ledger)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// COMMISSION AUDITOR
// ════════════════════════════════════════════════════════════════════════════

/// Detects program-ceiling violations in a commission-change history.
///
/// The auditor holds the commission ceiling, the caller-provided
/// current epoch, and the [`SpikePolicy`]. It carries no state between
/// [`audit()`](CommissionAuditor::audit) calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionAuditor {
    /// Program commission ceiling, percent.
    ceiling: f64,
    /// Current chain epoch. Epochs at or after this are unsettled and
    /// never classified.
    current_epoch: u64,
    /// Treatment of intra-epoch self-corrected spikes.
    spike_policy: SpikePolicy,
}

impl CommissionAuditor {
    /// Creates an auditor with the program's default ceiling.
    #[must_use]
    pub fn new(current_epoch: u64, spike_policy: SpikePolicy) -> Self {
        Self {
            ceiling: COMMISSION_CEILING_PCT,
            current_epoch,
            spike_policy,
        }
    }

    /// Overrides the ceiling. The default is the program's 10%.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Returns the current epoch this auditor classifies against.
    #[must_use]
    #[inline]
    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    /// Returns the spike policy in effect.
    #[must_use]
    #[inline]
    pub fn spike_policy(&self) -> SpikePolicy {
        self.spike_policy
    }

    /// Runs the full detection pipeline over an event sequence.
    ///
    /// ## Errors
    ///
    /// Returns `AuditError::Decode` when an event of a candidate
    /// account carries a malformed `created_at` timestamp.
    pub fn audit(
        &self,
        approved: &HashSet<String>,
        events: &[CommissionChangeEvent],
    ) -> Result<Vec<Violation>, AuditError> {
        let candidates = self.select_candidates(approved, events);
        let expanded = expand_to_full_history(&candidates, events);
        let ledger = EpochLedger::build(&expanded)?;
        Ok(self.classify(&ledger))
    }

    /// Stage 1: events of approved validators that raised their rate
    /// above the ceiling from a known prior rate.
    fn select_candidates<'a>(
        &self,
        approved: &HashSet<String>,
        events: &'a [CommissionChangeEvent],
    ) -> Vec<&'a CommissionChangeEvent> {
        events
            .iter()
            .filter(|e| {
                approved.contains(&e.account)
                    && e.commission_after > self.ceiling
                    && e.commission_before.is_some()
            })
            .collect()
    }

    /// Stage 4: per settled (account, epoch) group, decide violation
    /// from the authoritative last event, honoring the spike policy.
    fn classify(&self, ledger: &EpochLedger) -> Vec<Violation> {
        let mut violations = Vec::new();

        for history in &ledger.accounts {
            for group in &history.groups {
                if group.epoch >= self.current_epoch {
                    continue;
                }
                let Some(last) = group.events.last() else {
                    continue;
                };

                let evidence = if self.breaches_floor(&last.event) {
                    Some(last)
                } else {
                    match self.spike_policy {
                        SpikePolicy::FinalStateOnly => None,
                        SpikePolicy::CountIntraEpochSpikes => group
                            .events
                            .iter()
                            .rev()
                            .find(|oe| self.breaches_floor(&oe.event)),
                    }
                };

                if let Some(oe) = evidence {
                    violations.push(Violation {
                        account: history.account.clone(),
                        epoch: group.epoch,
                        occurred_at: oe.occurred_at,
                        event: oe.event.clone(),
                    });
                }
            }
        }

        violations
    }

    /// Classification predicate: the truncated rate exceeds the
    /// truncated ceiling. Matches end-of-epoch settlement, which only
    /// looks at whole percentage points: 10.9% does not breach a 10%
    /// ceiling here even though the candidate filter (raw comparison)
    /// admits it.
    fn breaches_floor(&self, event: &CommissionChangeEvent) -> bool {
        event.commission_after.floor() > self.ceiling.floor()
    }
}

/// Stage 2: all events (compliant ones included) of the accounts
/// present in the candidate set, in original input order.
fn expand_to_full_history<'a>(
    candidates: &[&CommissionChangeEvent],
    events: &'a [CommissionChangeEvent],
) -> Vec<&'a CommissionChangeEvent> {
    let candidate_accounts: HashSet<&str> =
        candidates.iter().map(|e| e.account.as_str()).collect();
    events
        .iter()
        .filter(|e| candidate_accounts.contains(e.account.as_str()))
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
