//! # Audit Configuration
//!
//! Environment-driven configuration for a single audit run, plus the
//! fixed constants of the delegation program.
//!
//! ## Environment Variables
//!
//! - `HISTORY_API_KEY`: token for the commission-history/directory API
//!   (default: empty; requests still carry the header)
//! - `RPC_URL`: chain RPC endpoint (default: mining-beta public RPC)
//! - `HISTORY_API_BASE`: base URL of the metrics API
//! - `NETWORK`: network name used in API paths (default: "mainnet")

/// Commission ceiling of the delegation program, in percent.
/// Participants pledge to stay at or below this rate.
pub const COMMISSION_CEILING_PCT: f64 = 10.0;

/// Start of the audited window, as sent in the `date_from` query.
pub const HISTORY_DATE_FROM: &str = "2022-01-01T00:00:12";

/// Fixed page size for commission-history pagination.
pub const PAGE_SIZE: usize = 1000;

/// On-chain account of the delegation program whose records hold
/// participant approval state.
pub const PROGRAM_ID: &str = "reg8X1V65CSdmrtEjMgnXZk96b9SUSQrJ8n1rP1ZMg7";

/// Timeout applied to every outbound HTTP/RPC call.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default chain RPC endpoint.
const DEFAULT_RPC_URL: &str = "https://api.mining-beta.stakenet.io/";

/// Default base URL of the commission-history/directory API.
const DEFAULT_HISTORY_API_BASE: &str = "https://metrics.stakenet.io/api/v1";

/// Default network name.
const DEFAULT_NETWORK: &str = "mainnet";

// ════════════════════════════════════════════════════════════════════════════
// AUDIT CONFIG
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for a single audit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// API token sent in the `Token` header of history/directory calls.
    pub api_key: String,
    /// Chain RPC endpoint URL.
    pub rpc_url: String,
    /// Base URL of the commission-history/directory API.
    pub history_api_base: String,
    /// Network name used in API paths.
    pub network: String,
    /// Start of the audited window (ISO8601, no timezone suffix).
    pub date_from: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            history_api_base: DEFAULT_HISTORY_API_BASE.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            date_from: HISTORY_DATE_FROM.to_string(),
        }
    }
}

impl AuditConfig {
    /// Builds an `AuditConfig` from environment variables.
    ///
    /// Every variable has a default; this never fails. An empty
    /// `RPC_URL` falls back to the default rather than producing an
    /// unusable endpoint.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("HISTORY_API_KEY").unwrap_or_default(),
            rpc_url: non_empty_or(std::env::var("RPC_URL").ok(), defaults.rpc_url),
            history_api_base: non_empty_or(
                std::env::var("HISTORY_API_BASE").ok(),
                defaults.history_api_base,
            ),
            network: non_empty_or(std::env::var("NETWORK").ok(), defaults.network),
            date_from: defaults.date_from,
        }
    }
}

/// Returns `value` when present and non-empty, `fallback` otherwise.
fn non_empty_or(value: Option<String>, fallback: String) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
