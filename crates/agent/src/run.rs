//! # Audit Orchestration
//!
//! The single entry point that wires the collaborators into the
//! detection pipeline. All dependencies are passed in so tests can
//! substitute in-memory fakes; nothing here touches the network
//! directly or runs at load time.
//!
//! ## Sequence
//!
//! 1. Fetch the commission-change history (paginated, may truncate).
//! 2. Fetch the validator directory and build the vote-key map.
//! 3. Fetch and decode the program registry; take the approved set.
//! 4. Fetch the current epoch.
//! 5. Detect violations and render the report lines.

use anyhow::Result;
use tracing::info;

use stakewatch_common::config::PROGRAM_ID;
use stakewatch_common::{
    approved_set, build_identity_to_vote_key_map, decode_participants, render_csv,
    AuditConfig, CommissionAuditor, SpikePolicy,
};

use crate::directory_api::ValidatorDirectoryApi;
use crate::history::{fetch_all_commission_changes, HistoryPageSource};
use crate::rpc::StakingProgramRpc;

/// Runs one full audit and returns the report lines.
///
/// ## Errors
///
/// Propagates fatal failures: RPC or directory fetch errors, malformed
/// program records, malformed event timestamps, and vote-key lookup
/// misses. History pagination failures are absorbed upstream (the
/// accumulated prefix is audited).
pub async fn run_audit<R, H, D>(
    rpc: &R,
    history: &H,
    directory: &D,
    config: &AuditConfig,
    spike_policy: SpikePolicy,
) -> Result<Vec<String>>
where
    R: StakingProgramRpc + Sync,
    H: HistoryPageSource + Sync,
    D: ValidatorDirectoryApi + Sync,
{
    info!(network = %config.network, date_from = %config.date_from, "fetching commission-change history");
    let events = fetch_all_commission_changes(history, &config.network, &config.date_from).await;
    info!(events = events.len(), "commission-change history fetched");

    let validators = directory.fetch_validators(&config.network).await?;
    let vote_keys = build_identity_to_vote_key_map(&validators);
    info!(validators = validators.len(), mapped = vote_keys.len(), "validator directory fetched");

    let raw_accounts = rpc.program_accounts(PROGRAM_ID).await?;
    let registry = decode_participants(&raw_accounts)?;
    let approved = approved_set(&registry);
    info!(participants = registry.len(), approved = approved.len(), "program registry decoded");

    let current_epoch = rpc.current_epoch().await?;
    let auditor = CommissionAuditor::new(current_epoch, spike_policy);
    let violations = auditor.audit(&approved, &events)?;
    info!(current_epoch, violations = violations.len(), "audit complete");

    Ok(render_csv(&violations, &vote_keys)?)
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stakewatch_common::{AuditError, CommissionChangeEvent, ValidatorRecord};

    // ────────────────────────────────────────────────────────────────────
    // FAKE COLLABORATORS
    // ────────────────────────────────────────────────────────────────────

    struct FakeRpc {
        records: Vec<Vec<u8>>,
        epoch: u64,
    }

    #[async_trait]
    impl StakingProgramRpc for FakeRpc {
        async fn program_accounts(&self, _program_id: &str) -> Result<Vec<Vec<u8>>, AuditError> {
            Ok(self.records.clone())
        }

        async fn current_epoch(&self) -> Result<u64, AuditError> {
            Ok(self.epoch)
        }
    }

    struct FakeHistory {
        events: Vec<CommissionChangeEvent>,
    }

    #[async_trait]
    impl HistoryPageSource for FakeHistory {
        async fn fetch_page(
            &self,
            _network: &str,
            _date_from: &str,
            _per: usize,
            page: usize,
        ) -> Result<Vec<CommissionChangeEvent>, AuditError> {
            // Everything fits on one short page.
            if page == 1 {
                Ok(self.events.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct FakeDirectory {
        validators: Vec<ValidatorRecord>,
    }

    #[async_trait]
    impl ValidatorDirectoryApi for FakeDirectory {
        async fn fetch_validators(
            &self,
            _network: &str,
        ) -> Result<Vec<ValidatorRecord>, AuditError> {
            Ok(self.validators.clone())
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl ValidatorDirectoryApi for FailingDirectory {
        async fn fetch_validators(
            &self,
            _network: &str,
        ) -> Result<Vec<ValidatorRecord>, AuditError> {
            Err(AuditError::Fetch("HTTP 502".to_string()))
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // HELPERS
    // ────────────────────────────────────────────────────────────────────

    fn approved_record(mb_fill: u8) -> Vec<u8> {
        let mut data = vec![0u8; 65];
        data[0..32].fill(0x01);
        data[32..64].fill(mb_fill);
        data[64] = 3;
        data
    }

    fn mb_key(fill: u8) -> String {
        bs58::encode(&[fill; 32]).into_string()
    }

    fn event(account: &str, epoch: u64, after: f64) -> CommissionChangeEvent {
        CommissionChangeEvent {
            account: account.to_string(),
            epoch,
            commission_before: Some(5.0),
            commission_after: after,
            created_at: "2022-03-14T09:26:53.589Z".to_string(),
            epoch_completion: 87.2,
        }
    }

    fn directory_for(identity: &str) -> FakeDirectory {
        FakeDirectory {
            validators: vec![ValidatorRecord {
                account: Some(identity.to_string()),
                vote_account: Some("VoteKey111".to_string()),
            }],
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // ORCHESTRATION
    // ────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn end_to_end_reports_a_settled_breach() {
        let identity = mb_key(0x2A);
        let rpc = FakeRpc {
            records: vec![approved_record(0x2A)],
            epoch: 300,
        };
        let history = FakeHistory {
            events: vec![event(&identity, 280, 100.0)],
        };
        let directory = directory_for(&identity);

        let lines = run_audit(
            &rpc,
            &history,
            &directory,
            &AuditConfig::default(),
            SpikePolicy::FinalStateOnly,
        )
        .await
        .unwrap();

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(&identity));
        assert!(lines[0].contains(",VoteKey111,"));
        assert!(lines[0].contains(",280,"));
    }

    #[tokio::test]
    async fn clean_history_reports_nothing() {
        let identity = mb_key(0x2A);
        let rpc = FakeRpc {
            records: vec![approved_record(0x2A)],
            epoch: 300,
        };
        let history = FakeHistory {
            events: vec![event(&identity, 280, 8.0)],
        };
        let directory = directory_for(&identity);

        let lines = run_audit(
            &rpc,
            &history,
            &directory,
            &AuditConfig::default(),
            SpikePolicy::FinalStateOnly,
        )
        .await
        .unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn malformed_program_record_aborts_the_run() {
        let rpc = FakeRpc {
            records: vec![vec![0u8; 12]],
            epoch: 300,
        };
        let history = FakeHistory { events: Vec::new() };
        let directory = FakeDirectory { validators: Vec::new() };

        let result = run_audit(
            &rpc,
            &history,
            &directory,
            &AuditConfig::default(),
            SpikePolicy::FinalStateOnly,
        )
        .await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<AuditError>().is_some());
    }

    #[tokio::test]
    async fn directory_failure_aborts_the_run() {
        let rpc = FakeRpc {
            records: Vec::new(),
            epoch: 300,
        };
        let history = FakeHistory { events: Vec::new() };

        let result = run_audit(
            &rpc,
            &history,
            &FailingDirectory,
            &AuditConfig::default(),
            SpikePolicy::FinalStateOnly,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_vote_key_for_violator_aborts_the_run() {
        let identity = mb_key(0x2A);
        let rpc = FakeRpc {
            records: vec![approved_record(0x2A)],
            epoch: 300,
        };
        let history = FakeHistory {
            events: vec![event(&identity, 280, 100.0)],
        };
        // Directory knows nothing about the violator.
        let directory = FakeDirectory { validators: Vec::new() };

        let result = run_audit(
            &rpc,
            &history,
            &directory,
            &AuditConfig::default(),
            SpikePolicy::FinalStateOnly,
        )
        .await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        match err.downcast_ref::<AuditError>() {
            Some(AuditError::MissingMapping { identity: missing }) => {
                assert_eq!(missing, &identity);
            }
            other => panic!("expected MissingMapping, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn spike_policy_is_threaded_through() {
        let identity = mb_key(0x2A);
        let rpc = FakeRpc {
            records: vec![approved_record(0x2A)],
            epoch: 300,
        };
        // Spike to 100, corrected to 8 within the same epoch.
        let mut spike = event(&identity, 280, 100.0);
        spike.created_at = "2022-03-14T09:00:00.000Z".to_string();
        let mut correction = event(&identity, 280, 8.0);
        correction.created_at = "2022-03-14T10:00:00.000Z".to_string();
        correction.commission_before = Some(100.0);

        let history = FakeHistory {
            events: vec![spike, correction],
        };
        let directory = directory_for(&identity);
        let config = AuditConfig::default();

        let lenient = run_audit(&rpc, &history, &directory, &config, SpikePolicy::FinalStateOnly)
            .await
            .unwrap();
        assert!(lenient.is_empty());

        let strict = run_audit(
            &rpc,
            &history,
            &directory,
            &config,
            SpikePolicy::CountIntraEpochSpikes,
        )
        .await
        .unwrap();
        assert_eq!(strict.len(), 1);
    }
}
