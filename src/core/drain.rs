//! Drain Simulator
//!
//! Heuristic probability that signing the transaction ends in fund loss.
//! A fixed lookup over the transaction type and coarse contract signals; the
//! table itself is documented in utils/constants.rs. Never fails.

use crate::models::{DrainEstimate, TxType};
use crate::utils::constants::{
    ATTACK_WINDOW_APPROVE_BASE, ATTACK_WINDOW_APPROVE_ESCALATED, ATTACK_WINDOW_IMMEDIATE,
    DRAIN_APPROVE_BASE, DRAIN_APPROVE_ESCALATED, DRAIN_BASELINE, DRAIN_SWAP_SUSPICIOUS,
    DRAIN_TRANSFER_SCAM,
};

/// Inputs the simulator looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrainInputs {
    pub tx_type: TxType,
    /// None when verification status could not be collected
    pub contract_verified: Option<bool>,
    /// None when transfer history was unavailable
    pub hop_distance: Option<i32>,
    /// Target contract is itself on the known-malicious list
    pub contract_listed: bool,
    /// Target contract has a degenerate address shape
    pub static_pattern: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DrainSimulator;

impl DrainSimulator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, inputs: &DrainInputs) -> DrainEstimate {
        let scam_linked = inputs.contract_listed || inputs.hop_distance == Some(0);

        // Nothing known about the contract: lowest-confidence baseline, flagged as default
        if inputs.contract_verified.is_none() && inputs.hop_distance.is_none() && !scam_linked {
            return DrainEstimate {
                probability: DRAIN_BASELINE,
                attack_window_blocks: 0,
                scam_linked: false,
                is_default: true,
            };
        }

        let unverified = inputs.contract_verified == Some(false);

        let (probability, window) = match inputs.tx_type {
            TxType::Approve if unverified || scam_linked => {
                (DRAIN_APPROVE_ESCALATED, ATTACK_WINDOW_APPROVE_ESCALATED)
            }
            TxType::Swap if unverified || inputs.static_pattern || scam_linked => {
                (DRAIN_SWAP_SUSPICIOUS, ATTACK_WINDOW_IMMEDIATE)
            }
            TxType::Transfer if scam_linked => (DRAIN_TRANSFER_SCAM, ATTACK_WINDOW_IMMEDIATE),
            other => base_row(other),
        };

        DrainEstimate {
            probability,
            attack_window_blocks: window,
            scam_linked,
            is_default: false,
        }
    }
}

fn base_row(tx_type: TxType) -> (f64, u64) {
    match tx_type {
        TxType::Approve => (DRAIN_APPROVE_BASE, ATTACK_WINDOW_APPROVE_BASE),
        TxType::Swap | TxType::Transfer => (DRAIN_BASELINE, 0),
    }
}
