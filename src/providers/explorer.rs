//! Block Explorer Client - contract verification
//!
//! Etherscan-compatible `module=contract&action=getsourcecode`.
//! A contract counts as verified when the explorer returns non-empty source.
//!
//! API: {base}?module=contract&action=getsourcecode&address={addr}&apikey={key}

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::models::{AppError, AppResult, EvmAddress};
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT_SECS, USER_AGENT};

/// Raw explorer envelope. `result` is a list on success and a message string on error.
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    pub result: ExplorerResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExplorerResult {
    Sources(Vec<SourceEntry>),
    Message(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceEntry {
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub contract_name: String,
}

impl ExplorerResponse {
    /// Verification status, or the error the explorer reported
    pub fn into_verified(self) -> AppResult<bool> {
        match self.result {
            ExplorerResult::Sources(entries) if self.status == "1" => Ok(entries
                .iter()
                .any(|e| !e.source_code.trim().is_empty())),
            ExplorerResult::Sources(_) => Err(AppError::explorer_error(format!(
                "Explorer status {}: {}",
                self.status, self.message
            ))),
            ExplorerResult::Message(msg) => {
                if msg.to_lowercase().contains("rate limit") {
                    Err(AppError::rpc_rate_limited())
                } else {
                    Err(AppError::explorer_error(format!("{}: {}", self.message, msg)))
                }
            }
        }
    }
}

/// Etherscan-compatible API client
#[derive(Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Whether the contract's source is published and verified
    pub async fn is_verified(&self, contract: &EvmAddress) -> AppResult<bool> {
        debug!("🔍 Explorer: checking verification for {}", contract);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", contract.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::rpc_rate_limited());
        }
        if !status.is_success() {
            return Err(AppError::explorer_error(format!("Explorer HTTP error: {}", status)));
        }

        let body: ExplorerResponse = response.json().await?;
        body.into_verified()
    }
}
