//! Type definitions for the risk scoring core
//! All data structures that flow between collection, graph, simulation and scoring

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{AppError, AppResult};
use crate::utils::constants::{CAUTION_MIN_SCORE, DANGEROUS_MIN_SCORE, MAX_SCORE, NO_CONNECTION};

/// A 20-byte EVM address, lower-cased at construction.
///
/// Every comparison, graph lookup and cache key goes through this type, so
/// normalization happens exactly once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EvmAddress(String);

impl EvmAddress {
    /// Parse `0x` + 40 hex characters (any case) into a normalized address
    pub fn parse(input: &str) -> AppResult<Self> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .ok_or_else(|| AppError::invalid_address(format!("{:?} must start with 0x", input)))?;

        if hex_part.len() != 40 {
            return Err(AppError::invalid_address(format!(
                "{:?} must be 0x followed by 40 hex characters",
                input
            )));
        }
        if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AppError::invalid_address(format!(
                "{:?} contains non-hex characters",
                input
            )));
        }

        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw address bytes
    pub fn to_alloy(&self) -> Address {
        // Validated in parse(), cannot fail
        Address::from_str(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EvmAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Transaction category being proposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Transfer,
    Swap,
    Approve,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Transfer => "transfer",
            TxType::Swap => "swap",
            TxType::Approve => "approve",
        }
    }
}

impl FromStr for TxType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(TxType::Transfer),
            "swap" => Ok(TxType::Swap),
            "approve" => Ok(TxType::Approve),
            other => Err(AppError::invalid_tx_type(format!(
                "tx_type {:?} must be one of transfer, swap, approve",
                other
            ))),
        }
    }
}

/// A validated, normalized analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub wallet: EvmAddress,
    pub contract: EvmAddress,
    pub tx_type: TxType,
}

impl AnalysisRequest {
    /// Validate raw inbound fields. Fails before any signal is collected.
    pub fn parse(wallet: &str, contract: &str, tx_type: &str) -> AppResult<Self> {
        Ok(Self {
            wallet: EvmAddress::parse(wallet)?,
            contract: EvmAddress::parse(contract)?,
            tx_type: tx_type.parse()?,
        })
    }
}

/// One observed transfer edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: f64,
    pub block_number: u64,
}

/// Independently collected signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    TransactionCount,
    ContractVerification,
    TransferHistory,
    ContractAge,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::TransactionCount => "transaction_count",
            SignalKind::ContractVerification => "contract_verification",
            SignalKind::TransferHistory => "transfer_history",
            SignalKind::ContractAge => "contract_age",
        }
    }
}

/// Output of the drain simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrainEstimate {
    /// Probability of fund loss in [0, 1]
    pub probability: f64,
    /// Blocks an attacker has to act on the granted access
    pub attack_window_blocks: u64,
    /// The target is the wallet itself or a listed malicious address
    pub scam_linked: bool,
    /// Inputs were missing; this is the unescalated row for the tx type
    pub is_default: bool,
}

/// Everything collected and computed for one request.
///
/// Owned by a single request's orchestration; never shared across requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalBundle {
    pub tx_type: TxType,
    pub tx_count: Option<u64>,
    pub contract_verified: Option<bool>,
    pub recent_transfers: Vec<TransferRecord>,
    /// -1 when no known connection was found
    pub hop_distance: i32,
    pub drain: DrainEstimate,
    pub static_pattern_flag: bool,
    pub contract_age_days: Option<u64>,
    /// Signals that failed and were replaced by their defaults, sorted
    pub unavailable: Vec<SignalKind>,
}

impl SignalBundle {
    /// Bundle with no evidence either way
    pub fn new(tx_type: TxType) -> Self {
        Self {
            tx_type,
            tx_count: None,
            contract_verified: None,
            recent_transfers: Vec::new(),
            hop_distance: NO_CONNECTION,
            drain: DrainEstimate {
                probability: 0.0,
                attack_window_blocks: 0,
                scam_linked: false,
                is_default: true,
            },
            static_pattern_flag: false,
            contract_age_days: None,
            unavailable: Vec::new(),
        }
    }

    pub fn is_new_wallet(&self) -> bool {
        self.tx_count == Some(0)
    }

    pub fn is_unverified_contract(&self) -> bool {
        self.contract_verified == Some(false)
    }

    pub fn is_unavailable(&self, kind: SignalKind) -> bool {
        self.unavailable.binary_search(&kind).is_ok()
    }

    /// Record a substituted signal, keeping the list sorted and unique
    pub fn mark_unavailable(&mut self, kind: SignalKind) {
        if let Err(pos) = self.unavailable.binary_search(&kind) {
            self.unavailable.insert(pos, kind);
        }
    }
}

/// Risk level classification, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Caution,
    Dangerous,
}

impl RiskLevel {
    /// Band lookup; lower bounds are inclusive
    pub fn from_score(score: u8) -> Self {
        if score >= DANGEROUS_MIN_SCORE {
            RiskLevel::Dangerous
        } else if score >= CAUTION_MIN_SCORE {
            RiskLevel::Caution
        } else {
            RiskLevel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Caution => "CAUTION",
            RiskLevel::Dangerous => "DANGEROUS",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "✅",
            RiskLevel::Caution => "🟠",
            RiskLevel::Dangerous => "🔴",
        }
    }
}

/// Final, immutable result of one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    risk_level: RiskLevel,
    score: u8,
    reasons: Vec<String>,
    signals: SignalBundle,
    timestamp: DateTime<Utc>,
    /// Produced after an internal fault; not part of the wire format
    #[serde(skip)]
    degraded: bool,
}

impl Verdict {
    /// Clamp the raw score to [0, 100] and derive the level from it.
    ///
    /// An empty reason list is replaced with a single generic sentence.
    pub fn new(
        raw_score: i32,
        mut reasons: Vec<String>,
        signals: SignalBundle,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let score = raw_score.clamp(0, MAX_SCORE as i32) as u8;
        if reasons.is_empty() {
            reasons.push("No risk indicators found".to_string());
        }
        Self {
            risk_level: RiskLevel::from_score(score),
            score,
            reasons,
            signals,
            timestamp,
            degraded: false,
        }
    }

    /// Flag a verdict built after an internal fault
    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn signals(&self) -> &SignalBundle {
        &self.signals
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{} {} ({}/100): {}",
            self.risk_level.emoji(),
            self.risk_level.as_str(),
            self.score,
            self.reasons.join(" | ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_lowercased() {
        let addr = EvmAddress::parse("0xDAC17F958D2EE523A2206206994597C13D831EC7").unwrap();
        assert_eq!(addr.as_str(), "0xdac17f958d2ee523a2206206994597c13d831ec7");
        assert_eq!(
            addr,
            EvmAddress::parse("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap()
        );
    }

    #[test]
    fn test_address_rejects_malformed_input() {
        assert!(EvmAddress::parse("dac17f958d2ee523a2206206994597c13d831ec7").is_err());
        assert!(EvmAddress::parse("0xdac17f958d2ee523a2206206994597c13d831ec").is_err());
        assert!(EvmAddress::parse("0xdac17f958d2ee523a2206206994597c13d831ec77").is_err());
        assert!(EvmAddress::parse("0xzac17f958d2ee523a2206206994597c13d831ec7").is_err());
        assert!(EvmAddress::parse("").is_err());
    }

    #[test]
    fn test_address_bytes() {
        let addr = EvmAddress::parse("0x0000000000000000000000000000000000000001").unwrap();
        let bytes = addr.to_alloy();
        assert_eq!(bytes.as_slice()[19], 1);
        assert!(bytes.as_slice()[..19].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_tx_type_parsing() {
        assert_eq!("approve".parse::<TxType>().unwrap(), TxType::Approve);
        assert_eq!("swap".parse::<TxType>().unwrap(), TxType::Swap);
        assert_eq!("transfer".parse::<TxType>().unwrap(), TxType::Transfer);
        let err = "send".parse::<TxType>().unwrap_err();
        assert!(err.is_validation());
        assert!("APPROVE".parse::<TxType>().is_err());
    }

    #[test]
    fn test_request_validation_reports_first_bad_field() {
        let err = AnalysisRequest::parse(
            "0x1234",
            "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "swap",
        )
        .unwrap_err();
        assert_eq!(err.code, crate::models::ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_level_band_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Dangerous);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Dangerous);
        assert!(RiskLevel::Safe < RiskLevel::Caution);
        assert!(RiskLevel::Caution < RiskLevel::Dangerous);
    }

    #[test]
    fn test_verdict_clamps_and_never_has_empty_reasons() {
        let bundle = SignalBundle::new(TxType::Transfer);
        let verdict = Verdict::new(155, vec![], bundle.clone(), Utc::now());
        assert_eq!(verdict.score(), 100);
        assert_eq!(verdict.risk_level(), RiskLevel::Dangerous);
        assert_eq!(verdict.reasons().len(), 1);

        let verdict = Verdict::new(-5, vec!["x".into()], bundle, Utc::now());
        assert_eq!(verdict.score(), 0);
        assert_eq!(verdict.risk_level(), RiskLevel::Safe);
    }

    #[test]
    fn test_unavailable_list_stays_sorted_and_unique() {
        let mut bundle = SignalBundle::new(TxType::Swap);
        bundle.mark_unavailable(SignalKind::TransferHistory);
        bundle.mark_unavailable(SignalKind::TransactionCount);
        bundle.mark_unavailable(SignalKind::TransferHistory);
        assert_eq!(
            bundle.unavailable,
            vec![SignalKind::TransactionCount, SignalKind::TransferHistory]
        );
        assert!(bundle.is_unavailable(SignalKind::TransactionCount));
        assert!(!bundle.is_unavailable(SignalKind::ContractAge));
    }
}
