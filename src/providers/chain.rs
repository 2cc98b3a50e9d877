//! Live chain data source
//!
//! Combines the JSON-RPC node, the Alchemy transfers API and the block
//! explorer behind [`ChainDataSource`]. Sources without credentials report
//! themselves unavailable and the pipeline falls back to defaults.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::alchemy::AlchemyClient;
use super::explorer::ExplorerClient;
use super::rpc::RpcProvider;
use super::sources::{ChainDataSource, SignalError, SignalResult};
use crate::models::{AppError, AppResult, EvmAddress, GuardConfig, TransferRecord};
use crate::utils::cache::{CacheStats, TtlCache};
use crate::utils::constants::{build_alchemy_url, SECS_PER_DAY};

/// Production [`ChainDataSource`]
pub struct LiveChainData {
    rpc: RpcProvider,
    alchemy: Option<AlchemyClient>,
    explorer: Option<ExplorerClient>,
    /// Keyed by address; value remembers the limit it was fetched with
    transfer_cache: TtlCache<(u32, Vec<TransferRecord>)>,
    verification_cache: TtlCache<bool>,
}

impl LiveChainData {
    pub fn from_config(config: &GuardConfig) -> AppResult<Self> {
        let rpc = RpcProvider::new(config.rpc_url.clone(), config.fallback_rpc_url.clone())?;

        let alchemy = match config.alchemy_api_key.as_deref() {
            Some(key) => Some(AlchemyClient::new(RpcProvider::new(
                build_alchemy_url(key),
                None,
            )?)),
            None => {
                warn!("⚠️ ALCHEMY_API_KEY not set: transfer history and contract age unavailable");
                None
            }
        };

        let explorer = match config.etherscan_api_key.as_deref() {
            Some(key) => Some(ExplorerClient::new(config.explorer_api_url.clone(), key)?),
            None => {
                warn!("⚠️ ETHERSCAN_API_KEY not set: contract verification unavailable");
                None
            }
        };

        info!(
            "🔌 Chain data sources: rpc={} alchemy={} explorer={}",
            rpc.masked_url(),
            alchemy.is_some(),
            explorer.is_some()
        );

        Ok(Self {
            rpc,
            alchemy,
            explorer,
            transfer_cache: TtlCache::new("transfers", config.cache_ttl),
            verification_cache: TtlCache::new("verification", config.cache_ttl),
        })
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![self.transfer_cache.stats(), self.verification_cache.stats()]
    }

    /// Evict expired cache entries, returning how many were removed
    pub fn cleanup_caches(&self) -> usize {
        self.transfer_cache.cleanup_expired() + self.verification_cache.cleanup_expired()
    }

    fn alchemy(&self) -> SignalResult<&AlchemyClient> {
        self.alchemy
            .as_ref()
            .ok_or_else(|| SignalError::from(AppError::missing_api_key("ALCHEMY_API_KEY")))
    }
}

#[async_trait]
impl ChainDataSource for LiveChainData {
    async fn transaction_count(&self, wallet: &EvmAddress) -> SignalResult<u64> {
        Ok(self.rpc.transaction_count(wallet).await?)
    }

    async fn contract_verified(&self, contract: &EvmAddress) -> SignalResult<bool> {
        if let Some(verified) = self.verification_cache.get(contract) {
            return Ok(verified);
        }

        // Externally owned accounts have no source to verify
        let code = self.rpc.get_code(contract).await?;
        if code.is_empty() {
            debug!("{} has no bytecode, treating as verified", contract);
            self.verification_cache.set(contract.clone(), true);
            return Ok(true);
        }

        let explorer = self
            .explorer
            .as_ref()
            .ok_or_else(|| SignalError::from(AppError::missing_api_key("ETHERSCAN_API_KEY")))?;
        let verified = explorer.is_verified(contract).await?;
        self.verification_cache.set(contract.clone(), verified);
        Ok(verified)
    }

    async fn recent_transfers(
        &self,
        address: &EvmAddress,
        limit: u32,
    ) -> SignalResult<Vec<TransferRecord>> {
        if let Some((cached_limit, mut records)) = self.transfer_cache.get(address) {
            if cached_limit >= limit {
                records.truncate(limit as usize);
                return Ok(records);
            }
        }

        let records = self.alchemy()?.recent_transfers(address, limit).await?;
        self.transfer_cache
            .set(address.clone(), (limit, records.clone()));
        Ok(records)
    }

    async fn contract_age_days(&self, contract: &EvmAddress) -> SignalResult<u64> {
        let alchemy = self.alchemy()?;
        let Some(block) = alchemy.first_activity_block(contract).await? else {
            return Ok(0);
        };
        let deployed_at = alchemy.provider().block_timestamp(&block).await?;
        Ok(age_in_days(deployed_at, Utc::now().timestamp()))
    }
}

/// Whole days between two unix timestamps, never negative
fn age_in_days(then: i64, now: i64) -> u64 {
    (now.saturating_sub(then).max(0) / SECS_PER_DAY) as u64
}
