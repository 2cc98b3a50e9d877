//! Signal Sources
//!
//! The seam between the scoring pipeline and the outside world. Each method
//! is one independent signal; the orchestrator calls them concurrently and
//! treats every error as "signal unavailable".

use async_trait::async_trait;
use std::fmt;

use crate::models::{AppError, ErrorCode, EvmAddress, TransferRecord};

/// Why a signal could not be collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// No answer within the per-signal timeout or the analysis deadline
    Timeout,
    /// Upstream throttled us
    RateLimited,
    /// Any other upstream failure
    Provider(String),
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::Timeout => f.write_str("timed out"),
            SignalError::RateLimited => f.write_str("rate limited"),
            SignalError::Provider(msg) => write!(f, "provider error: {}", msg),
        }
    }
}

impl std::error::Error for SignalError {}

impl From<AppError> for SignalError {
    fn from(err: AppError) -> Self {
        match err.code {
            ErrorCode::RpcTimeout | ErrorCode::ExternalTimeout => SignalError::Timeout,
            ErrorCode::RpcRateLimited | ErrorCode::ApiRateLimited => SignalError::RateLimited,
            _ => SignalError::Provider(err.to_string()),
        }
    }
}

pub type SignalResult<T> = Result<T, SignalError>;

/// Read-only chain data needed for one analysis
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Number of transactions sent by `wallet`
    async fn transaction_count(&self, wallet: &EvmAddress) -> SignalResult<u64>;

    /// Whether the contract's source code is verified
    async fn contract_verified(&self, contract: &EvmAddress) -> SignalResult<bool>;

    /// Most recent transfers touching `address`, newest first, at most `limit`
    async fn recent_transfers(
        &self,
        address: &EvmAddress,
        limit: u32,
    ) -> SignalResult<Vec<TransferRecord>>;

    /// Days since the contract's first observed activity
    async fn contract_age_days(&self, contract: &EvmAddress) -> SignalResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            SignalError::from(AppError::rpc_timeout("slow")),
            SignalError::Timeout
        );
        assert_eq!(
            SignalError::from(AppError::rpc_rate_limited()),
            SignalError::RateLimited
        );
        assert!(matches!(
            SignalError::from(AppError::explorer_error("NOTOK")),
            SignalError::Provider(msg) if msg.contains("EXPLORER")
        ));
    }
}
