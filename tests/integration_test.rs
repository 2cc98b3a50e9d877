//! End-to-end scoring scenarios through the public library API

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use walletwork::{
    AnalysisConfig, AnalysisOrchestrator, AnalysisRequest, ChainDataSource, EvmAddress,
    KnownMaliciousSet, RiskLevel, SignalError, SignalKind, SignalResult, TransferRecord,
};

const WALLET: &str = "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c";
const CONTRACT: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";
const SCAMMER: &str = "0x098b716b8aaf21512996dc57eb0615e2383e2f96";

fn addr(s: &str) -> EvmAddress {
    EvmAddress::parse(s).unwrap()
}

/// Scripted chain: `None` fails the call, `slow_tx_count` outlives every timeout
#[derive(Default)]
struct ScriptedChain {
    tx_count: Option<u64>,
    verified: Option<bool>,
    transfers: HashMap<EvmAddress, Vec<TransferRecord>>,
    age_days: Option<u64>,
    slow_tx_count: bool,
}

#[async_trait]
impl ChainDataSource for ScriptedChain {
    async fn transaction_count(&self, _wallet: &EvmAddress) -> SignalResult<u64> {
        if self.slow_tx_count {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        self.tx_count.ok_or(SignalError::Timeout)
    }

    async fn contract_verified(&self, _contract: &EvmAddress) -> SignalResult<bool> {
        self.verified
            .ok_or_else(|| SignalError::Provider("explorer down".to_string()))
    }

    async fn recent_transfers(
        &self,
        address: &EvmAddress,
        limit: u32,
    ) -> SignalResult<Vec<TransferRecord>> {
        let mut records = self.transfers.get(address).cloned().unwrap_or_default();
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn contract_age_days(&self, _contract: &EvmAddress) -> SignalResult<u64> {
        self.age_days.ok_or(SignalError::RateLimited)
    }
}

fn transfer(from: &str, to: &str) -> TransferRecord {
    TransferRecord {
        from: addr(from),
        to: addr(to),
        value: 0.5,
        block_number: 19_000_000,
    }
}

fn orchestrator(chain: ScriptedChain, config: AnalysisConfig) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        Arc::new(chain),
        Arc::new(KnownMaliciousSet::from_addresses([addr(SCAMMER)])),
        config,
    )
}

fn request(tx_type: &str) -> AnalysisRequest {
    AnalysisRequest::parse(WALLET, CONTRACT, tx_type).unwrap()
}

#[tokio::test]
async fn test_established_wallet_transfer_is_safe() {
    let chain = ScriptedChain {
        tx_count: Some(5),
        verified: Some(true),
        age_days: Some(1500),
        ..Default::default()
    };
    let verdict = orchestrator(chain, AnalysisConfig::default())
        .analyze(request("transfer"))
        .await;

    assert_eq!(verdict.score(), 5);
    assert_eq!(verdict.risk_level(), RiskLevel::Safe);
    assert_eq!(verdict.signals().hop_distance, -1);
    assert!(!verdict.reasons().is_empty());
}

#[tokio::test]
async fn test_fresh_wallet_approving_unverified_contract_is_dangerous() {
    let chain = ScriptedChain {
        tx_count: Some(0),
        verified: Some(false),
        age_days: Some(2),
        ..Default::default()
    };
    let verdict = orchestrator(chain, AnalysisConfig::default())
        .analyze(request("approve"))
        .await;

    assert_eq!(verdict.score(), 90);
    assert_eq!(verdict.risk_level(), RiskLevel::Dangerous);
    assert!(verdict.signals().is_new_wallet());
    assert!(verdict.signals().is_unverified_contract());
}

#[tokio::test]
async fn test_swap_one_hop_from_scammer_is_caution() {
    let mut transfers = HashMap::new();
    transfers.insert(addr(WALLET), vec![transfer(SCAMMER, WALLET)]);
    let chain = ScriptedChain {
        tx_count: Some(3),
        verified: Some(true),
        transfers,
        age_days: Some(400),
        ..Default::default()
    };
    let verdict = orchestrator(chain, AnalysisConfig::default())
        .analyze(request("swap"))
        .await;

    assert_eq!(verdict.signals().hop_distance, 1);
    assert_eq!(verdict.score(), 45);
    assert_eq!(verdict.risk_level(), RiskLevel::Caution);
    assert!(verdict
        .reasons()
        .iter()
        .any(|r| r.contains("directly with a known malicious address")));
}

#[tokio::test]
async fn test_timed_out_tx_count_is_not_treated_as_fresh() {
    let chain = ScriptedChain {
        tx_count: Some(0),
        verified: Some(true),
        age_days: Some(400),
        slow_tx_count: true,
        ..Default::default()
    };
    let config = AnalysisConfig {
        signal_timeout: Duration::from_millis(100),
        analysis_deadline: Duration::from_millis(300),
        ..Default::default()
    };
    let verdict = orchestrator(chain, config).analyze(request("transfer")).await;

    assert_eq!(verdict.signals().tx_count, Some(1));
    assert!(!verdict.signals().is_new_wallet());
    assert!(verdict
        .signals()
        .is_unavailable(SignalKind::TransactionCount));
    assert_eq!(verdict.score(), 5);
    assert!(verdict
        .reasons()
        .iter()
        .any(|r| r.contains("Wallet history unavailable")));
}

#[tokio::test]
async fn test_every_source_failing_still_returns_verdict() {
    let chain = ScriptedChain::default();
    let verdict = orchestrator(chain, AnalysisConfig::default())
        .analyze(request("approve"))
        .await;

    let signals = verdict.signals();
    assert_eq!(signals.unavailable.len(), 3);
    assert!(!signals.is_unavailable(SignalKind::TransferHistory));
    assert_eq!(signals.contract_verified, None);
    assert_eq!(signals.contract_age_days, None);
    // Only the category points remain
    assert_eq!(verdict.score(), 25);
}

#[tokio::test]
async fn test_fault_after_collection_degrades_to_caution() {
    let mut transfers = HashMap::new();
    transfers.insert(addr(WALLET), vec![transfer(WALLET, SCAMMER)]);
    let chain = ScriptedChain {
        tx_count: Some(50),
        verified: Some(true),
        transfers,
        age_days: Some(400),
        ..Default::default()
    };
    let config = AnalysisConfig {
        max_graph_nodes: 1,
        ..Default::default()
    };
    let verdict = orchestrator(chain, config).analyze(request("transfer")).await;

    assert!(verdict.risk_level() >= RiskLevel::Caution);
    assert!(verdict.is_degraded());
    assert!(verdict.reasons()[0].starts_with("Analysis incomplete"));
}

#[tokio::test]
async fn test_same_request_scores_identically() {
    let build = || ScriptedChain {
        tx_count: Some(0),
        verified: Some(true),
        age_days: Some(30),
        ..Default::default()
    };
    let first = orchestrator(build(), AnalysisConfig::default())
        .analyze(request("swap"))
        .await;
    let second = orchestrator(build(), AnalysisConfig::default())
        .analyze(request("swap"))
        .await;

    assert_eq!(first.score(), second.score());
    assert_eq!(first.reasons(), second.reasons());
}
