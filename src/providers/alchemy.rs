//! Alchemy Transfers API
//!
//! alchemy_getAssetTransfers feeds two signals: the recent transfer history
//! that becomes the proximity graph, and the first observed activity of a
//! contract, used for its age.
//!
//! Compute Units: alchemy_getAssetTransfers = 120 CU per call

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rpc::{parse_hex_u64, RpcProvider};
use crate::models::{AppResult, EvmAddress, TransferRecord};

/// Transfer category filter
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferCategory {
    External,
    Internal,
    Erc20,
}

/// Categories that move value between accounts
const VALUE_CATEGORIES: [TransferCategory; 3] = [
    TransferCategory::External,
    TransferCategory::Internal,
    TransferCategory::Erc20,
];

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Transfers sent by the address
    Outgoing,
    /// Transfers received by the address
    Incoming,
}

/// Asset transfer entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfer {
    pub block_num: String,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: Option<f64>,
    pub category: String,
}

impl AssetTransfer {
    /// Graph edge for this transfer. Contract creations and malformed
    /// entries have no usable edge.
    pub fn to_record(&self) -> Option<TransferRecord> {
        let from = EvmAddress::parse(&self.from).ok()?;
        let to = EvmAddress::parse(self.to.as_deref()?).ok()?;
        let block_number = parse_hex_u64(&self.block_num).ok()?;
        Some(TransferRecord {
            from,
            to,
            value: self.value.unwrap_or(0.0),
            block_number,
        })
    }
}

/// Response from alchemy_getAssetTransfers
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfersResponse {
    pub transfers: Vec<AssetTransfer>,
    pub page_key: Option<String>,
}

/// Alchemy Enhanced API client on top of an Alchemy-backed [`RpcProvider`]
#[derive(Clone)]
pub struct AlchemyClient {
    provider: RpcProvider,
}

impl AlchemyClient {
    pub fn new(provider: RpcProvider) -> Self {
        Self { provider }
    }

    /// One page of transfers in one direction
    pub async fn get_asset_transfers(
        &self,
        address: &EvmAddress,
        direction: Direction,
        newest_first: bool,
        max_count: u32,
    ) -> AppResult<AssetTransfersResponse> {
        let mut params = serde_json::json!({
            "fromBlock": "0x0",
            "toBlock": "latest",
            "category": VALUE_CATEGORIES,
            "order": if newest_first { "desc" } else { "asc" },
            "withMetadata": false,
            "excludeZeroValue": false,
            "maxCount": format!("0x{:x}", max_count.max(1)),
        });
        let key = match direction {
            Direction::Outgoing => "fromAddress",
            Direction::Incoming => "toAddress",
        };
        params[key] = serde_json::Value::String(address.to_string());

        self.provider
            .call::<AssetTransfersResponse>("alchemy_getAssetTransfers", serde_json::json!([params]))
            .await
    }

    /// Most recent transfers in both directions, newest first
    pub async fn recent_transfers(
        &self,
        address: &EvmAddress,
        limit: u32,
    ) -> AppResult<Vec<TransferRecord>> {
        let (outgoing, incoming) = tokio::try_join!(
            self.get_asset_transfers(address, Direction::Outgoing, true, limit),
            self.get_asset_transfers(address, Direction::Incoming, true, limit),
        )?;

        let records = merge_newest_first(
            outgoing.transfers.iter().chain(incoming.transfers.iter()),
            limit as usize,
        );
        debug!("📜 {} transfers for {}", records.len(), address);
        Ok(records)
    }

    /// Hex block number of the first transfer touching `address`, if any
    pub async fn first_activity_block(&self, address: &EvmAddress) -> AppResult<Option<String>> {
        let (outgoing, incoming) = tokio::try_join!(
            self.get_asset_transfers(address, Direction::Outgoing, false, 1),
            self.get_asset_transfers(address, Direction::Incoming, false, 1),
        )?;

        Ok(outgoing
            .transfers
            .iter()
            .chain(incoming.transfers.iter())
            .filter_map(|t| parse_hex_u64(&t.block_num).ok().map(|n| (n, &t.block_num)))
            .min_by_key(|(n, _)| *n)
            .map(|(_, raw)| raw.clone()))
    }

    pub fn provider(&self) -> &RpcProvider {
        &self.provider
    }
}

/// Edges sorted by block, newest first, truncated to `limit`
fn merge_newest_first<'a>(
    transfers: impl Iterator<Item = &'a AssetTransfer>,
    limit: usize,
) -> Vec<TransferRecord> {
    let mut records: Vec<TransferRecord> = transfers.filter_map(AssetTransfer::to_record).collect();
    records.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    records.truncate(limit);
    records
}
