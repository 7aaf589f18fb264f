//! # Validator Directory Collaborator
//!
//! Fetches the current validator metadata snapshot, from which the
//! identity → vote-key map is built. Unlike history pagination, a
//! failure here is fatal: without the directory no report line can be
//! rendered.

use std::time::Duration;

use async_trait::async_trait;

use stakewatch_common::config::HTTP_TIMEOUT_SECS;
use stakewatch_common::{AuditError, ValidatorRecord};

/// Validator-directory surface the audit depends on.
#[async_trait]
pub trait ValidatorDirectoryApi {
    /// Returns the full validator snapshot for a network.
    async fn fetch_validators(&self, network: &str) -> Result<Vec<ValidatorRecord>, AuditError>;
}

/// HTTP client for the validator directory API.
#[derive(Clone)]
pub struct ValidatorDirectoryClient {
    base: String,
    api_key: String,
    client: reqwest::Client,
}

impl ValidatorDirectoryClient {
    /// Creates a client for the given API base URL and token.
    pub fn new(base: &str, api_key: &str) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuditError::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl ValidatorDirectoryApi for ValidatorDirectoryClient {
    async fn fetch_validators(&self, network: &str) -> Result<Vec<ValidatorRecord>, AuditError> {
        let url = format!("{}/validators/{}.json?order=stake", self.base, network);

        let response = self
            .client
            .get(&url)
            .header("Token", &self.api_key)
            .send()
            .await
            .map_err(|e| AuditError::Fetch(format!("validator directory fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::Fetch(format!(
                "validator directory returned HTTP {}",
                status.as_u16(),
            )));
        }

        response.json().await.map_err(|e| {
            AuditError::Fetch(format!("failed to parse validator directory: {}", e))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
