//! WalletWork CLI - analyze a single pending transaction
//!
//! Usage:
//!   walletwork <wallet> <contract> <approve|swap|transfer>
//!
//! Prints the verdict as the same JSON the API returns.

use std::sync::Arc;

use eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

use walletwork::api::AnalyzeResponse;
use walletwork::{
    AnalysisOrchestrator, AnalysisRequest, GuardConfig, KnownMaliciousSet, LiveChainData,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [wallet, contract, tx_type] = args.as_slice() else {
        eprintln!("Usage: walletwork <wallet> <contract> <approve|swap|transfer>");
        return Err(eyre!("expected 3 arguments, got {}", args.len()));
    };

    let request = AnalysisRequest::parse(wallet, contract, tx_type)?;

    let config = GuardConfig::from_env()?;
    let malicious = Arc::new(KnownMaliciousSet::load(config.malicious_list_path.as_deref())?);
    let source = Arc::new(LiveChainData::from_config(&config)?);
    let orchestrator = AnalysisOrchestrator::new(source, malicious, config.analysis.clone());

    let verdict = orchestrator.analyze(request).await;
    let response = AnalyzeResponse::from(&verdict);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
