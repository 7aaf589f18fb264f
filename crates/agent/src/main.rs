//! # Stakewatch Agent CLI
//!
//! Audits delegation-program participants for commission-ceiling
//! violations and prints one CSV line per violation to stdout. Logs go
//! to stderr so the report stays pipeable.
//!
//! ## Usage
//!
//! ```bash
//! stakewatch                            # audit mainnet with env config
//! stakewatch --network testnet
//! stakewatch --count-intra-epoch-spikes # also flag self-corrected spikes
//! ```
//!
//! ## Environment Variables
//!
//! - `HISTORY_API_KEY`: token for the commission-history/directory API
//! - `RPC_URL`: chain RPC endpoint (default: mining-beta public RPC)
//! - `HISTORY_API_BASE`: base URL of the metrics API
//! - `NETWORK`: network name used in API paths (default: mainnet)
//!
//! CLI flags override their environment counterparts. The process
//! exits non-zero on any unrecoverable fetch or decode error.

mod directory_api;
mod history;
mod rpc;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

use stakewatch_common::{AuditConfig, SpikePolicy};

use crate::directory_api::ValidatorDirectoryClient;
use crate::history::CommissionHistoryClient;
use crate::rpc::ChainRpcClient;
use crate::run::run_audit;

#[derive(Parser)]
#[command(version, about = "Delegation-program commission audit")]
struct Cli {
    /// Network whose history and directory are audited
    #[arg(long)]
    network: Option<String>,

    /// Chain RPC endpoint (overrides RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Start of the audited window, ISO8601 without timezone suffix
    #[arg(long)]
    since: Option<String>,

    /// Also flag ceiling breaches that were corrected before epoch end
    #[arg(long)]
    count_intra_epoch_spikes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AuditConfig::from_env();
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(since) = cli.since {
        config.date_from = since;
    }
    let spike_policy = if cli.count_intra_epoch_spikes {
        SpikePolicy::CountIntraEpochSpikes
    } else {
        SpikePolicy::FinalStateOnly
    };

    let rpc = ChainRpcClient::new(&config.rpc_url)?;
    let history = CommissionHistoryClient::new(&config.history_api_base, &config.api_key)?;
    let directory = ValidatorDirectoryClient::new(&config.history_api_base, &config.api_key)?;

    let lines = run_audit(&rpc, &history, &directory, &config, spike_policy).await?;
    for line in &lines {
        println!("{}", line);
    }

    Ok(())
}
