//! WalletWork Library
//!
//! Pre-transaction risk scoring for wallet interactions:
//! - Concurrent signal collection with per-signal timeouts and defaults
//! - Bounded-depth proximity to known malicious addresses
//! - Advisory drain simulation per transaction type
//! - Deterministic, explainable 0-100 risk verdicts

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    AnalysisOrchestrator, DrainSimulator, GraphProximityEngine, RiskAggregator, TransferGraph,
};
pub use models::{
    AnalysisConfig, AnalysisRequest, AppError, AppResult, ErrorCode, EvmAddress, GuardConfig,
    RiskLevel, SignalBundle, SignalKind, TransferRecord, TxType, Verdict,
};
pub use providers::{ChainDataSource, LiveChainData, SignalError, SignalResult};
pub use utils::{KnownMaliciousSet, TelemetryCollector, TelemetryStats};
