//! Analysis Orchestrator
//!
//! Drives one request through collect → graph → simulate → score.
//!
//! Only collection awaits I/O. Each source is bounded by its own timeout and
//! by the shared analysis deadline; a failed source is replaced by its
//! default. Faults in the synchronous phases (errors or panics) produce a
//! degraded CAUTION verdict. `analyze` never fails.

use chrono::Utc;
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::defaults::apply_default;
use super::drain::{DrainInputs, DrainSimulator};
use super::graph::{GraphProximityEngine, Proximity, TransferGraph};
use super::patterns;
use super::risk_score::RiskAggregator;
use crate::models::{
    AnalysisConfig, AnalysisRequest, AppError, AppResult, EvmAddress, SignalBundle, SignalKind,
    TransferRecord, Verdict,
};
use crate::providers::sources::{ChainDataSource, SignalError, SignalResult};
use crate::utils::malicious::KnownMaliciousSet;

/// Lifecycle of one request, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Collecting,
    GraphBuilt,
    Simulated,
    Scored,
    Returned,
    DegradedReturned,
}

/// Per-request pipeline over shared, read-only state
pub struct AnalysisOrchestrator {
    source: Arc<dyn ChainDataSource>,
    malicious: Arc<KnownMaliciousSet>,
    config: AnalysisConfig,
    engine: GraphProximityEngine,
    simulator: DrainSimulator,
    aggregator: RiskAggregator,
}

impl AnalysisOrchestrator {
    pub fn new(
        source: Arc<dyn ChainDataSource>,
        malicious: Arc<KnownMaliciousSet>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            source,
            malicious,
            engine: GraphProximityEngine::new(config.max_hop_depth),
            simulator: DrainSimulator::new(),
            aggregator: RiskAggregator::new(),
            config,
        }
    }

    pub fn malicious_set(&self) -> &KnownMaliciousSet {
        &self.malicious
    }

    /// Analyze a validated request. Always returns a verdict.
    pub async fn analyze(&self, request: AnalysisRequest) -> Verdict {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        log_stage(&request_id, Stage::Received);

        log_stage(&request_id, Stage::Collecting);
        let collected = self.collect(&request).await;
        let timestamp = Utc::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate(&request_id, &request, collected.clone(), timestamp)
        }));

        let fault = match outcome {
            Ok(Ok(verdict)) => {
                log_stage(&request_id, Stage::Returned);
                Ok(verdict)
            }
            Ok(Err(e)) => Err(e),
            Err(panic) => Err(AppError::analysis_fault(format!(
                "panicked: {}",
                panic_message(&*panic)
            ))),
        };

        let verdict = match fault {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(%request_id, "❌ Analysis fault [{}]: {}", e.code_str(), e.message);
                log_stage(&request_id, Stage::DegradedReturned);
                let mut partial = collected;
                partial.static_pattern_flag = patterns::detect(&request.contract).is_some();
                self.aggregator.degraded(
                    &partial,
                    "an internal error interrupted scoring",
                    timestamp,
                )
            }
        };

        info!(
            %request_id,
            tx_type = request.tx_type.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {} ({}/100)",
            verdict.risk_level().emoji(),
            verdict.risk_level().as_str(),
            verdict.score()
        );
        verdict
    }

    /// Concurrent signal collection with per-signal defaults
    async fn collect(&self, request: &AnalysisRequest) -> SignalBundle {
        let deadline = Instant::now() + self.config.analysis_deadline;

        let (tx_count, verified, transfers, age) = tokio::join!(
            self.bounded(
                SignalKind::TransactionCount,
                deadline,
                self.source.transaction_count(&request.wallet),
            ),
            self.bounded(
                SignalKind::ContractVerification,
                deadline,
                self.source.contract_verified(&request.contract),
            ),
            self.collect_transfers(&request.wallet, deadline),
            self.bounded(
                SignalKind::ContractAge,
                deadline,
                self.source.contract_age_days(&request.contract),
            ),
        );

        let mut bundle = SignalBundle::new(request.tx_type);
        match tx_count {
            Ok(count) => bundle.tx_count = Some(count),
            Err(_) => apply_default(&mut bundle, SignalKind::TransactionCount),
        }
        match verified {
            Ok(flag) => bundle.contract_verified = Some(flag),
            Err(_) => apply_default(&mut bundle, SignalKind::ContractVerification),
        }
        match transfers {
            Ok(records) => bundle.recent_transfers = records,
            Err(_) => apply_default(&mut bundle, SignalKind::TransferHistory),
        }
        match age {
            Ok(days) => bundle.contract_age_days = Some(days),
            Err(_) => apply_default(&mut bundle, SignalKind::ContractAge),
        }
        bundle
    }

    /// Run one source call under min(signal timeout, deadline)
    async fn bounded<T>(
        &self,
        kind: SignalKind,
        deadline: Instant,
        call: impl Future<Output = SignalResult<T>>,
    ) -> SignalResult<T> {
        let until = deadline.min(Instant::now() + self.config.signal_timeout);
        let result = match timeout_at(until, guarded(call)).await {
            Ok(result) => result,
            Err(_) => Err(SignalError::Timeout),
        };
        if let Err(e) = &result {
            warn!(signal = kind.as_str(), "⚠️ Signal unavailable: {}", e);
        }
        result
    }

    /// The wallet's own transfers plus one layer of counterparty history.
    ///
    /// Only the wallet's own fetch decides availability; counterparty
    /// failures just leave the graph shallower.
    async fn collect_transfers(
        &self,
        wallet: &EvmAddress,
        deadline: Instant,
    ) -> SignalResult<Vec<TransferRecord>> {
        let limit = self.config.transfer_history_limit;
        let mut records = self
            .bounded(
                SignalKind::TransferHistory,
                deadline,
                self.source.recent_transfers(wallet, limit),
            )
            .await?;

        let counterparties = self.counterparties(wallet, &records);
        if counterparties.is_empty() {
            return Ok(records);
        }

        let until = deadline.min(Instant::now() + self.config.signal_timeout);
        let expansions = join_all(
            counterparties
                .iter()
                .map(|cp| timeout_at(until, guarded(self.source.recent_transfers(cp, limit)))),
        )
        .await;

        for (cp, expansion) in counterparties.iter().zip(expansions) {
            match expansion {
                Ok(Ok(more)) => records.extend(more),
                Ok(Err(e)) => debug!("Counterparty {} history unavailable: {}", cp, e),
                Err(_) => debug!("Counterparty {} history timed out", cp),
            }
        }
        Ok(records)
    }

    /// Up to `counterparty_fanout` distinct counterparties, most recent first.
    /// Listed addresses are skipped; they are already one hop away.
    fn counterparties(&self, wallet: &EvmAddress, records: &[TransferRecord]) -> Vec<EvmAddress> {
        let mut seen = HashSet::new();
        records
            .iter()
            .flat_map(|r| [&r.from, &r.to])
            .filter(|addr| *addr != wallet && !self.malicious.contains(addr))
            .filter(|addr| seen.insert((*addr).clone()))
            .take(self.config.counterparty_fanout)
            .cloned()
            .collect()
    }

    /// Synchronous phases over collected data
    fn evaluate(
        &self,
        request_id: &Uuid,
        request: &AnalysisRequest,
        mut bundle: SignalBundle,
        timestamp: chrono::DateTime<Utc>,
    ) -> AppResult<Verdict> {
        let history_available = !bundle.is_unavailable(SignalKind::TransferHistory);

        let proximity = if history_available {
            let graph = TransferGraph::build(
                &request.wallet,
                &bundle.recent_transfers,
                self.config.max_graph_nodes,
            )?;
            debug!(
                %request_id,
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "{:?}",
                Stage::GraphBuilt
            );
            self.engine
                .nearest_malicious(&graph, &request.wallet, &self.malicious)
        } else {
            Proximity::none()
        };
        if let Some(nearest) = &proximity.nearest {
            info!(
                %request_id,
                "🚨 Wallet is {} hop(s) from listed address {}",
                proximity.hop_distance,
                nearest
            );
        }
        bundle.hop_distance = proximity.hop_distance;

        if let Some(pattern) = patterns::detect(&request.contract) {
            debug!(%request_id, "Target address shape: {}", pattern.description());
            bundle.static_pattern_flag = true;
        }

        bundle.drain = self.simulator.estimate(&DrainInputs {
            tx_type: request.tx_type,
            contract_verified: bundle.contract_verified,
            hop_distance: history_available.then_some(bundle.hop_distance),
            contract_listed: self.malicious.contains(&request.contract),
            static_pattern: bundle.static_pattern_flag,
        });
        log_stage(request_id, Stage::Simulated);

        let verdict = self.aggregator.aggregate(&bundle, timestamp);
        log_stage(request_id, Stage::Scored);
        Ok(verdict)
    }
}

/// A panicking source call becomes a provider error for that signal only
async fn guarded<T>(call: impl Future<Output = SignalResult<T>>) -> SignalResult<T> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(SignalError::Provider(format!(
            "source panicked: {}",
            panic_message(&*panic)
        ))),
    }
}

fn log_stage(request_id: &Uuid, stage: Stage) {
    debug!(%request_id, "{:?}", stage);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    const WALLET: &str = "0x1111111111111111111111111111111111111112";
    const CONTRACT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
    const ATTACKER: &str = "0x9999999999999999999999999999999999999998";
    const PEER: &str = "0x3333333333333333333333333333333333333334";

    fn addr(s: &str) -> EvmAddress {
        EvmAddress::parse(s).unwrap()
    }

    /// Canned answers; `None` fails the call, `hang` never answers
    #[derive(Default)]
    struct MockSource {
        tx_count: Option<u64>,
        verified: Option<bool>,
        transfers: HashMap<EvmAddress, Vec<TransferRecord>>,
        transfers_fail: bool,
        age: Option<u64>,
        hang_tx_count: bool,
        panic_age: bool,
        panic_peer_history: bool,
    }

    #[async_trait]
    impl ChainDataSource for MockSource {
        async fn transaction_count(&self, _wallet: &EvmAddress) -> SignalResult<u64> {
            if self.hang_tx_count {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.tx_count
                .ok_or_else(|| SignalError::Provider("down".into()))
        }

        async fn contract_verified(&self, _contract: &EvmAddress) -> SignalResult<bool> {
            self.verified
                .ok_or_else(|| SignalError::Provider("down".into()))
        }

        async fn recent_transfers(
            &self,
            address: &EvmAddress,
            _limit: u32,
        ) -> SignalResult<Vec<TransferRecord>> {
            if self.transfers_fail {
                return Err(SignalError::RateLimited);
            }
            if self.panic_peer_history && address.as_str() == PEER {
                panic!("peer history bug");
            }
            Ok(self.transfers.get(address).cloned().unwrap_or_default())
        }

        async fn contract_age_days(&self, _contract: &EvmAddress) -> SignalResult<u64> {
            if self.panic_age {
                panic!("age source bug");
            }
            self.age.ok_or(SignalError::Timeout)
        }
    }

    fn edge(from: &str, to: &str) -> TransferRecord {
        TransferRecord {
            from: addr(from),
            to: addr(to),
            value: 1.0,
            block_number: 1,
        }
    }

    fn orchestrator(source: MockSource, config: AnalysisConfig) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            Arc::new(source),
            Arc::new(KnownMaliciousSet::from_addresses([addr(ATTACKER)])),
            config,
        )
    }

    fn request(tx_type: &str) -> AnalysisRequest {
        AnalysisRequest::parse(WALLET, CONTRACT, tx_type).unwrap()
    }

    #[tokio::test]
    async fn test_all_signals_available() {
        let source = MockSource {
            tx_count: Some(5),
            verified: Some(true),
            age: Some(2000),
            ..Default::default()
        };
        let verdict = orchestrator(source, AnalysisConfig::default())
            .analyze(request("transfer"))
            .await;
        assert_eq!(verdict.score(), 5);
        assert_eq!(verdict.risk_level(), RiskLevel::Safe);
        assert!(verdict.signals().unavailable.is_empty());
        assert_eq!(verdict.signals().contract_age_days, Some(2000));
    }

    #[tokio::test]
    async fn test_counterparty_expansion_finds_second_hop() {
        let mut transfers = HashMap::new();
        transfers.insert(addr(WALLET), vec![edge(WALLET, PEER)]);
        transfers.insert(addr(PEER), vec![edge(PEER, ATTACKER)]);
        let source = MockSource {
            tx_count: Some(3),
            verified: Some(true),
            transfers,
            age: Some(10),
            ..Default::default()
        };
        let verdict = orchestrator(source, AnalysisConfig::default())
            .analyze(request("swap"))
            .await;
        assert_eq!(verdict.signals().hop_distance, 2);
        assert_eq!(verdict.score(), 30);
    }

    #[tokio::test]
    async fn test_hung_tx_count_defaults_to_established_wallet() {
        let source = MockSource {
            tx_count: Some(0),
            verified: Some(true),
            age: Some(10),
            hang_tx_count: true,
            ..Default::default()
        };
        let config = AnalysisConfig {
            signal_timeout: Duration::from_millis(50),
            analysis_deadline: Duration::from_millis(200),
            ..Default::default()
        };
        let verdict = orchestrator(source, config)
            .analyze(request("transfer"))
            .await;
        assert_eq!(verdict.signals().tx_count, Some(1));
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
    async fn test_history_failure_is_no_signal() {
        let source = MockSource {
            tx_count: Some(4),
            verified: Some(true),
            transfers_fail: true,
            age: Some(10),
            ..Default::default()
        };
        let verdict = orchestrator(source, AnalysisConfig::default())
            .analyze(request("transfer"))
            .await;
        assert_eq!(verdict.signals().hop_distance, -1);
        assert!(verdict.signals().is_unavailable(SignalKind::TransferHistory));
        assert!(verdict
            .reasons()
            .iter()
            .any(|r| r.contains("Transfer history unavailable")));
    }

    #[tokio::test]
    async fn test_scoring_fault_returns_degraded_caution() {
        let mut transfers = HashMap::new();
        transfers.insert(
            addr(WALLET),
            vec![edge(WALLET, PEER), edge(PEER, ATTACKER)],
        );
        let source = MockSource {
            tx_count: Some(100),
            verified: Some(true),
            transfers,
            age: Some(10),
            ..Default::default()
        };
        let config = AnalysisConfig {
            max_graph_nodes: 1,
            counterparty_fanout: 0,
            ..Default::default()
        };
        let verdict = orchestrator(source, config).analyze(request("transfer")).await;
        assert!(verdict.risk_level() >= RiskLevel::Caution);
        assert!(verdict.reasons()[0].contains("incomplete"));
    }

    #[tokio::test]
    async fn test_scoring_fault_keeps_dangerous_verdict() {
        let mut transfers = HashMap::new();
        transfers.insert(addr(WALLET), vec![edge(WALLET, PEER)]);
        let source = MockSource {
            tx_count: Some(0),
            verified: Some(false),
            transfers,
            age: Some(1),
            ..Default::default()
        };
        let config = AnalysisConfig {
            max_graph_nodes: 1,
            counterparty_fanout: 0,
            ..Default::default()
        };
        let verdict = orchestrator(source, config).analyze(request("approve")).await;
        assert!(verdict.is_degraded());
        assert_eq!(verdict.score(), 90);
        assert_eq!(verdict.risk_level(), RiskLevel::Dangerous);
        assert!(verdict.reasons()[0].contains("incomplete"));
    }

    #[tokio::test]
    async fn test_panicking_source_only_loses_its_signal() {
        let source = MockSource {
            tx_count: Some(0),
            verified: Some(true),
            age: Some(10),
            panic_age: true,
            ..Default::default()
        };
        let orchestrator = Arc::new(orchestrator(source, AnalysisConfig::default()));
        let verdict = tokio::spawn(async move { orchestrator.analyze(request("transfer")).await })
            .await
            .expect("panic escaped analyze");

        assert!(verdict.signals().is_unavailable(SignalKind::ContractAge));
        assert_eq!(verdict.signals().contract_age_days, None);
        // Sibling signals still arrive
        assert_eq!(verdict.signals().tx_count, Some(0));
        assert_eq!(verdict.score(), 35);
    }

    #[tokio::test]
    async fn test_panicking_counterparty_fetch_is_ignored() {
        let mut transfers = HashMap::new();
        transfers.insert(addr(WALLET), vec![edge(WALLET, PEER)]);
        let source = MockSource {
            tx_count: Some(3),
            verified: Some(true),
            transfers,
            age: Some(10),
            panic_peer_history: true,
            ..Default::default()
        };
        let verdict = orchestrator(source, AnalysisConfig::default())
            .analyze(request("transfer"))
            .await;
        assert!(!verdict.signals().is_unavailable(SignalKind::TransferHistory));
        assert_eq!(verdict.signals().hop_distance, -1);
        assert!(!verdict.is_degraded());
    }

    #[tokio::test]
    async fn test_approve_to_unverified_contract_gets_drain_advisory() {
        let source = MockSource {
            tx_count: Some(0),
            verified: Some(false),
            age: Some(1),
            ..Default::default()
        };
        let verdict = orchestrator(source, AnalysisConfig::default())
            .analyze(request("approve"))
            .await;
        assert_eq!(verdict.score(), 90);
        assert_eq!(verdict.signals().drain.probability, 0.85);
        assert_eq!(verdict.signals().drain.attack_window_blocks, 10);
        assert!(verdict.reasons().last().unwrap().contains("85%"));
    }
}
