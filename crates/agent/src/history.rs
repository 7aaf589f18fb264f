//! # Commission History Fetcher
//!
//! Pages through the commission-changes API and accumulates every
//! change event for a network since a given date.
//!
//! ## Truncation On Error
//!
//! A failed page is not retried and does not abort the run: pagination
//! stops and the accumulated prefix is used as-is. Downstream detection
//! assumes the history is complete, so a mid-pagination failure
//! silently under-reports; the trade-off is accepted (no partial-page
//! recovery) and the truncation point is logged as a warning.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use stakewatch_common::config::{HTTP_TIMEOUT_SECS, PAGE_SIZE};
use stakewatch_common::{AuditError, CommissionChangeEvent};

// ════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// One page of commission-change history.
#[async_trait]
pub trait HistoryPageSource {
    /// Fetches page `page` (1-based) of up to `per` events for the
    /// given network, starting at `date_from`.
    async fn fetch_page(
        &self,
        network: &str,
        date_from: &str,
        per: usize,
        page: usize,
    ) -> Result<Vec<CommissionChangeEvent>, AuditError>;
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP CLIENT
// ════════════════════════════════════════════════════════════════════════════

/// Response body of one commission-changes page.
#[derive(Deserialize)]
struct HistoryPage {
    commission_histories: Vec<CommissionChangeEvent>,
}

/// HTTP client for the commission-changes API.
#[derive(Clone)]
pub struct CommissionHistoryClient {
    base: String,
    api_key: String,
    client: reqwest::Client,
}

impl CommissionHistoryClient {
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
impl HistoryPageSource for CommissionHistoryClient {
    async fn fetch_page(
        &self,
        network: &str,
        date_from: &str,
        per: usize,
        page: usize,
    ) -> Result<Vec<CommissionChangeEvent>, AuditError> {
        let url = format!(
            "{}/commission-changes/{}.json?date_from={}&per={}&page={}",
            self.base, network, date_from, per, page,
        );

        let response = self
            .client
            .get(&url)
            .header("Token", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                AuditError::Fetch(format!("commission-changes page {} failed: {}", page, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::Fetch(format!(
                "commission-changes page {} returned HTTP {}",
                page,
                status.as_u16(),
            )));
        }

        let body: HistoryPage = response.json().await.map_err(|e| {
            AuditError::Fetch(format!(
                "failed to parse commission-changes page {}: {}",
                page, e,
            ))
        })?;

        Ok(body.commission_histories)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PAGINATION
// ════════════════════════════════════════════════════════════════════════════

/// Fetches the full commission-change history, page by page.
///
/// Starts at page 1 with the fixed page size and stops when a page
/// returns fewer events than the page size, or when a call fails, in
/// which case the accumulated prefix is returned (see module docs).
pub async fn fetch_all_commission_changes<S>(
    source: &S,
    network: &str,
    date_from: &str,
) -> Vec<CommissionChangeEvent>
where
    S: HistoryPageSource + Sync,
{
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        match source.fetch_page(network, date_from, PAGE_SIZE, page).await {
            Ok(events) => {
                let count = events.len();
                all.extend(events);
                debug!(page, count, "fetched commission-changes page");
                if count < PAGE_SIZE {
                    break;
                }
                page += 1;
            }
            Err(e) => {
                warn!(
                    page,
                    error = %e,
                    "commission-changes pagination stopped early; result set is truncated",
                );
                break;
            }
        }
    }

    all
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
