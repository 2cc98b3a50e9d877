//! Risk Scoring Module
//! Maps a collected signal bundle to a 0-100 score, a level and reasons
//!
//! Pure and deterministic: the same bundle always yields the same score,
//! level and reason order. Drain probability is advisory only and never
//! changes the score.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::defaults::unavailable_reason;
use crate::models::{SignalBundle, SignalKind, TxType, Verdict};
use crate::utils::constants::{
    APPROVE_POINTS, DEGRADED_SCORE, DRAIN_FINDING_THRESHOLD, FRESH_WALLET_POINTS, NO_CONNECTION,
    PROXIMITY_POINTS_BY_HOP, PROXIMITY_POINTS_FAR, STATIC_PATTERN_POINTS, SWAP_POINTS,
    TRANSFER_POINTS, UNVERIFIED_CONTRACT_POINTS,
};

/// Scoring categories, in reason order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    WalletFreshness,
    ContractVerification,
    GraphProximity,
    TransactionType,
    StaticPattern,
}

/// Individual factor contributing to score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreFactor {
    pub category: Category,
    pub points: i32,
    /// Sentence shown to the user; None when the category stays silent
    pub reason: Option<String>,
}

/// Fixed additive scoring policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Per-category points and reasons, in category order
    pub fn breakdown(&self, bundle: &SignalBundle) -> Vec<ScoreFactor> {
        vec![
            wallet_freshness(bundle),
            contract_verification(bundle),
            graph_proximity(bundle),
            transaction_type(bundle.tx_type),
            static_pattern(bundle),
        ]
    }

    /// Score the bundle
    pub fn aggregate(&self, bundle: &SignalBundle, timestamp: DateTime<Utc>) -> Verdict {
        let factors = self.breakdown(bundle);
        let raw_score: i32 = factors.iter().map(|f| f.points).sum();

        let mut reasons: Vec<String> = factors.into_iter().filter_map(|f| f.reason).collect();
        if let Some(advisory) = drain_advisory(bundle) {
            reasons.push(advisory);
        }

        Verdict::new(raw_score, reasons, bundle.clone(), timestamp)
    }

    /// Safe-side verdict after an internal fault.
    ///
    /// Categories that do not depend on the transfer graph still count, so
    /// risk already proven by collection is kept. Never below CAUTION.
    pub fn degraded(
        &self,
        bundle: &SignalBundle,
        detail: &str,
        timestamp: DateTime<Utc>,
    ) -> Verdict {
        let proven = [
            wallet_freshness(bundle),
            contract_verification(bundle),
            transaction_type(bundle.tx_type),
            static_pattern(bundle),
        ];
        let proven_score: i32 = proven.iter().map(|f| f.points).sum();

        let mut reasons = vec![format!("Analysis incomplete: {}", detail)];
        reasons.extend(
            proven
                .into_iter()
                .filter(|f| f.points > 0)
                .filter_map(|f| f.reason),
        );
        reasons.push(
            "Risk could not be fully assessed; review this transaction carefully".to_string(),
        );

        Verdict::new(
            proven_score.max(DEGRADED_SCORE),
            reasons,
            bundle.clone(),
            timestamp,
        )
        .into_degraded()
    }
}

/// Points for a hop distance; -1 scores nothing
pub fn proximity_points(hop_distance: i32) -> i32 {
    if hop_distance == NO_CONNECTION || hop_distance < 0 {
        return 0;
    }
    PROXIMITY_POINTS_BY_HOP
        .get(hop_distance as usize)
        .copied()
        .unwrap_or(PROXIMITY_POINTS_FAR)
}

pub fn transaction_type_points(tx_type: TxType) -> i32 {
    match tx_type {
        TxType::Approve => APPROVE_POINTS,
        TxType::Swap => SWAP_POINTS,
        TxType::Transfer => TRANSFER_POINTS,
    }
}

fn substituted(bundle: &SignalBundle, category: Category, kind: SignalKind) -> Option<ScoreFactor> {
    if !bundle.is_unavailable(kind) {
        return None;
    }
    Some(ScoreFactor {
        category,
        points: 0,
        reason: unavailable_reason(kind).map(str::to_string),
    })
}

fn wallet_freshness(bundle: &SignalBundle) -> ScoreFactor {
    let category = Category::WalletFreshness;
    if let Some(factor) = substituted(bundle, category, SignalKind::TransactionCount) {
        return factor;
    }
    if bundle.is_new_wallet() {
        ScoreFactor {
            category,
            points: FRESH_WALLET_POINTS,
            reason: Some("This wallet has never sent a transaction".to_string()),
        }
    } else {
        ScoreFactor {
            category,
            points: 0,
            reason: Some("Wallet has an established transaction history".to_string()),
        }
    }
}

fn contract_verification(bundle: &SignalBundle) -> ScoreFactor {
    let category = Category::ContractVerification;
    if let Some(factor) = substituted(bundle, category, SignalKind::ContractVerification) {
        return factor;
    }
    match bundle.contract_verified {
        Some(false) => ScoreFactor {
            category,
            points: UNVERIFIED_CONTRACT_POINTS,
            reason: Some("Target contract source code is not verified".to_string()),
        },
        Some(true) => ScoreFactor {
            category,
            points: 0,
            reason: Some("Target contract source code is verified".to_string()),
        },
        None => ScoreFactor {
            category,
            points: 0,
            reason: None,
        },
    }
}

fn graph_proximity(bundle: &SignalBundle) -> ScoreFactor {
    let category = Category::GraphProximity;
    if let Some(factor) = substituted(bundle, category, SignalKind::TransferHistory) {
        return factor;
    }
    let hop = bundle.hop_distance;
    let reason = match hop {
        h if h < 0 => "No connection to known malicious addresses found nearby".to_string(),
        0 => "This wallet is itself listed as a known malicious address".to_string(),
        1 => "Wallet has transacted directly with a known malicious address".to_string(),
        n => format!("Wallet is {} transfers away from a known malicious address", n),
    };
    ScoreFactor {
        category,
        points: proximity_points(hop),
        reason: Some(reason),
    }
}

fn transaction_type(tx_type: TxType) -> ScoreFactor {
    let reason = match tx_type {
        TxType::Approve => "Token approvals grant the contract ongoing access to your funds",
        TxType::Swap => "Swaps carry moderate risk from malicious routers and price manipulation",
        TxType::Transfer => "Plain transfers carry minimal inherent risk",
    };
    ScoreFactor {
        category: Category::TransactionType,
        points: transaction_type_points(tx_type),
        reason: Some(reason.to_string()),
    }
}

fn static_pattern(bundle: &SignalBundle) -> ScoreFactor {
    let (points, reason) = if bundle.static_pattern_flag {
        (
            STATIC_PATTERN_POINTS,
            Some("Target address has an unusual shape not seen in normally deployed contracts".to_string()),
        )
    } else {
        (0, None)
    };
    ScoreFactor {
        category: Category::StaticPattern,
        points,
        reason,
    }
}

fn drain_advisory(bundle: &SignalBundle) -> Option<String> {
    let drain = &bundle.drain;
    if drain.is_default || drain.probability < DRAIN_FINDING_THRESHOLD {
        return None;
    }
    let window = match drain.attack_window_blocks {
        0 => String::new(),
        1 => " as soon as the next block".to_string(),
        n => format!(" within about {} blocks", n),
    };
    Some(format!(
        "Simulation estimates a {:.0}% chance of losing funds{}",
        drain.probability * 100.0,
        window
    ))
}
