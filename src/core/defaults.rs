//! Per-signal failure defaults
//!
//! The one place the fail-open policy lives: when a source fails, its signal
//! is replaced with the value below and the matching reason is shown to the
//! user instead of a finding.

use crate::models::{SignalBundle, SignalKind};
use crate::utils::constants::NO_CONNECTION;

/// One row of the default table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDefault {
    pub kind: SignalKind,
    /// Human-readable form of the substituted value, for logs
    pub value: &'static str,
    /// Reason sentence shown in place of a finding, if any
    pub reason: Option<&'static str>,
}

/// Signal name → default value → reason text
pub const DEFAULT_TABLE: [SignalDefault; 4] = [
    SignalDefault {
        kind: SignalKind::TransactionCount,
        value: "tx_count = 1 (established account)",
        reason: Some("Wallet history unavailable; treated as an established account"),
    },
    SignalDefault {
        kind: SignalKind::ContractVerification,
        value: "verification unknown (not scored)",
        reason: Some("Contract verification status could not be confirmed"),
    },
    SignalDefault {
        kind: SignalKind::TransferHistory,
        value: "no transfers, hop distance -1",
        reason: Some("Transfer history unavailable; proximity to known scams was not assessed"),
    },
    SignalDefault {
        kind: SignalKind::ContractAge,
        value: "age unknown",
        reason: None,
    },
];

/// Table row for a signal
pub fn default_for(kind: SignalKind) -> &'static SignalDefault {
    // Table is exhaustive over SignalKind
    match kind {
        SignalKind::TransactionCount => &DEFAULT_TABLE[0],
        SignalKind::ContractVerification => &DEFAULT_TABLE[1],
        SignalKind::TransferHistory => &DEFAULT_TABLE[2],
        SignalKind::ContractAge => &DEFAULT_TABLE[3],
    }
}

/// Write the default value for `kind` into the bundle and mark it unavailable
pub fn apply_default(bundle: &mut SignalBundle, kind: SignalKind) {
    match kind {
        SignalKind::TransactionCount => bundle.tx_count = Some(1),
        SignalKind::ContractVerification => bundle.contract_verified = None,
        SignalKind::TransferHistory => {
            bundle.recent_transfers.clear();
            bundle.hop_distance = NO_CONNECTION;
        }
        SignalKind::ContractAge => bundle.contract_age_days = None,
    }
    bundle.mark_unavailable(kind);
}

/// Reason text for a substituted signal, if it has one
pub fn unavailable_reason(kind: SignalKind) -> Option<&'static str> {
    default_for(kind).reason
}
