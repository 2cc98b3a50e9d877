//! Constants Module - Single Source of Truth
//!
//! Every scoring weight, level threshold, drain-table row and timing default
//! lives here. Policy changes are made in this file and nowhere else.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "WalletWork";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = "WalletWork/0.1.0";

// ============================================
// SCORING POLICY
// ============================================

/// Upper bound of the clamped score
pub const MAX_SCORE: u8 = 100;

/// Lowest score classified CAUTION (29 is SAFE)
pub const CAUTION_MIN_SCORE: u8 = 30;

/// Lowest score classified DANGEROUS (69 is CAUTION)
pub const DANGEROUS_MIN_SCORE: u8 = 70;

/// Wallet has never sent a transaction
pub const FRESH_WALLET_POINTS: i32 = 30;

/// Target contract source is not verified
pub const UNVERIFIED_CONTRACT_POINTS: i32 = 35;

/// Degenerate target address shape
pub const STATIC_PATTERN_POINTS: i32 = 15;

/// Graph proximity points for hop distances 0, 1 and 2
pub const PROXIMITY_POINTS_BY_HOP: [i32; 3] = [50, 35, 20];

/// Graph proximity points for any connection 3 or more hops out
pub const PROXIMITY_POINTS_FAR: i32 = 10;

/// Transaction category points
pub const APPROVE_POINTS: i32 = 25;
pub const SWAP_POINTS: i32 = 10;
pub const TRANSFER_POINTS: i32 = 5;

/// Score floor for a verdict produced after an internal fault (CAUTION band)
pub const DEGRADED_SCORE: i32 = 50;

/// Drain estimates at or above this are phrased as a finding
pub const DRAIN_FINDING_THRESHOLD: f64 = 0.5;

// ============================================
// DRAIN SIMULATION TABLE
// ============================================
//
// | tx type  | condition                                  | probability | window |
// |----------|--------------------------------------------|-------------|--------|
// | approve  | base                                       | 0.70        | 1000   |
// | approve  | contract unverified or scam-linked         | 0.85        | 10     |
// | swap     | contract unverified, suspicious or linked  | 0.90        | 1      |
// | transfer | target is 0-hop / listed malicious         | 0.95        | 1      |
// | any      | otherwise                                  | 0.05        | 0      |

pub const DRAIN_APPROVE_BASE: f64 = 0.70;
pub const DRAIN_APPROVE_ESCALATED: f64 = 0.85;
pub const DRAIN_SWAP_SUSPICIOUS: f64 = 0.90;
pub const DRAIN_TRANSFER_SCAM: f64 = 0.95;
pub const DRAIN_BASELINE: f64 = 0.05;

pub const ATTACK_WINDOW_APPROVE_BASE: u64 = 1000;
pub const ATTACK_WINDOW_APPROVE_ESCALATED: u64 = 10;
pub const ATTACK_WINDOW_IMMEDIATE: u64 = 1;

// ============================================
// GRAPH PROXIMITY
// ============================================

/// Sentinel for "no known connection found"
pub const NO_CONNECTION: i32 = -1;

/// Default BFS depth cap (hops)
pub const DEFAULT_MAX_HOP_DEPTH: u32 = 3;

/// Default node cap for one request's transfer graph
pub const DEFAULT_MAX_GRAPH_NODES: usize = 5000;

/// Counterparties whose own history is fetched for the second layer
pub const DEFAULT_COUNTERPARTY_FANOUT: usize = 5;

/// Transfers fetched per address
pub const DEFAULT_TRANSFER_HISTORY_LIMIT: u32 = 50;

// ============================================
// TIMING
// ============================================

/// Per-source call timeout (milliseconds)
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 2500;

/// Overall collection deadline per request (milliseconds)
pub const DEFAULT_ANALYSIS_DEADLINE_MS: u64 = 4000;

/// HTTP client timeout for provider requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;

/// Provider cache TTL (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Provider retries stay well inside the collection deadline
pub const RPC_MAX_RETRIES: u32 = 2;
pub const RPC_BASE_RETRY_MS: u64 = 150;
pub const RPC_MAX_RETRY_MS: u64 = 1000;
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// ENDPOINTS
// ============================================

/// Public Ethereum RPC used when no primary URL is configured
pub const PUBLIC_RPC_FALLBACK: &str = "https://eth.llamarpc.com";

/// Etherscan-compatible explorer API
pub const DEFAULT_EXPLORER_API_URL: &str = "https://api.etherscan.io/api";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Build Alchemy Ethereum mainnet URL from API key
pub fn build_alchemy_url(api_key: &str) -> String {
    format!("https://eth-mainnet.g.alchemy.com/v2/{}", api_key)
}

/// Seconds per day, for contract age
pub const SECS_PER_DAY: i64 = 86_400;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds_are_ordered() {
        assert!(CAUTION_MIN_SCORE < DANGEROUS_MIN_SCORE);
        assert!(DANGEROUS_MIN_SCORE <= MAX_SCORE);
    }

    #[test]
    fn test_degraded_score_is_at_least_caution() {
        assert!(DEGRADED_SCORE >= CAUTION_MIN_SCORE as i32);
    }

    #[test]
    fn test_proximity_points_decrease_with_distance() {
        assert!(PROXIMITY_POINTS_BY_HOP.windows(2).all(|w| w[0] > w[1]));
        assert!(PROXIMITY_POINTS_BY_HOP[2] > PROXIMITY_POINTS_FAR);
    }

    #[test]
    fn test_alchemy_url() {
        assert_eq!(
            build_alchemy_url("abc"),
            "https://eth-mainnet.g.alchemy.com/v2/abc"
        );
    }
}
