//! # Chain RPC Collaborator
//!
//! JSON-RPC client for the staking chain. Two calls feed the audit:
//! `getProgramAccounts` (raw participant records of the delegation
//! program, base64-encoded) and `getEpochInfo` (the current epoch the
//! classifier settles against).
//!
//! The trait seam exists so tests can substitute an in-memory fake for
//! the network client. Every call carries a bounded timeout; transport
//! failures and RPC error responses surface as `AuditError::Fetch` and
//! terminate the run: a partial registry or a guessed epoch would
//! corrupt the audit.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use stakewatch_common::config::HTTP_TIMEOUT_SECS;
use stakewatch_common::AuditError;

// ════════════════════════════════════════════════════════════════════════════
// TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Chain RPC surface the audit depends on.
#[async_trait]
pub trait StakingProgramRpc {
    /// Returns the raw data buffers of all accounts owned by the given
    /// program, base64-decoded.
    async fn program_accounts(&self, program_id: &str) -> Result<Vec<Vec<u8>>, AuditError>;

    /// Returns the current chain epoch.
    async fn current_epoch(&self) -> Result<u64, AuditError>;
}

// ════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ════════════════════════════════════════════════════════════════════════════

/// JSON-RPC 2.0 response envelope.
#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

/// JSON-RPC error object.
#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One entry of a `getProgramAccounts` result.
#[derive(Deserialize)]
struct KeyedAccount {
    account: AccountInfo,
}

/// Account payload; `data` is `[<base64>, "base64"]`.
#[derive(Deserialize)]
struct AccountInfo {
    data: (String, String),
}

/// `getEpochInfo` result.
#[derive(Deserialize)]
struct EpochInfo {
    epoch: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// CLIENT
// ════════════════════════════════════════════════════════════════════════════

/// JSON-RPC client over HTTP.
#[derive(Clone)]
pub struct ChainRpcClient {
    url: String,
    client: reqwest::Client,
}

impl ChainRpcClient {
    /// Creates a client for the given RPC endpoint.
    pub fn new(url: &str) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuditError::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Issues one JSON-RPC call and unwraps the envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, AuditError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AuditError::Fetch(format!("rpc call '{}' to '{}' failed: {}", method, self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::Fetch(format!(
                "rpc call '{}' returned HTTP {}",
                method,
                status.as_u16(),
            )));
        }

        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| {
            AuditError::Fetch(format!("failed to parse '{}' response: {}", method, e))
        })?;

        if let Some(err) = envelope.error {
            return Err(AuditError::Fetch(format!(
                "rpc error on '{}' (code {}): {}",
                method, err.code, err.message,
            )));
        }

        envelope.result.ok_or_else(|| {
            AuditError::Fetch(format!(
                "rpc call '{}' returned neither result nor error",
                method,
            ))
        })
    }
}

#[async_trait]
impl StakingProgramRpc for ChainRpcClient {
    async fn program_accounts(&self, program_id: &str) -> Result<Vec<Vec<u8>>, AuditError> {
        let accounts: Vec<KeyedAccount> = self
            .call(
                "getProgramAccounts",
                serde_json::json!([program_id, { "encoding": "base64" }]),
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| {
                general_purpose::STANDARD
                    .decode(&keyed.account.data.0)
                    .map_err(|e| {
                        AuditError::Decode(format!("account data is not valid base64: {}", e))
                    })
            })
            .collect()
    }

    async fn current_epoch(&self) -> Result<u64, AuditError> {
        let info: EpochInfo = self.call("getEpochInfo", serde_json::json!([])).await?;
        Ok(info.epoch)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_program_accounts_result() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "result": [
                {"pubkey": "4Nd1m", "account": {"data": ["AAEC", "base64"], "lamports": 1}}
            ]
        }"#;
        let envelope: RpcEnvelope<Vec<KeyedAccount>> = serde_json::from_str(json).unwrap();
        let accounts = envelope.result.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account.data.0, "AAEC");
        assert_eq!(accounts[0].account.data.1, "base64");
    }

    #[test]
    fn account_payload_base64_roundtrip() {
        let decoded = general_purpose::STANDARD.decode("AAEC").unwrap();
        assert_eq!(decoded, vec![0u8, 1, 2]);
    }

    #[test]
    fn deserialize_epoch_info_result() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "result": {"epoch": 291, "slotIndex": 12}}"#;
        let envelope: RpcEnvelope<EpochInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.result.unwrap().epoch, 291);
    }

    #[test]
    fn deserialize_rpc_error() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "method not found"}}"#;
        let envelope: RpcEnvelope<EpochInfo> = serde_json::from_str(json).unwrap();
        assert!(envelope.result.is_none());
        let err = envelope.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "method not found");
    }

    #[test]
    fn client_construction_succeeds() {
        assert!(ChainRpcClient::new("http://127.0.0.1:8899").is_ok());
    }
}
