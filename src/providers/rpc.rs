//! RPC Client Module - Ethereum JSON-RPC
//!
//! 1. Primary URL from config (Alchemy or any node), public fallback
//! 2. Short exponential backoff with jitter, kept inside the signal timeout
//! 3. User-Agent header & API key masking in logs
//! 4. Gzip compression on responses

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{AppError, AppResult, ErrorCode, EvmAddress};
use crate::utils::constants::{
    DEFAULT_RPC_TIMEOUT_SECS, RETRY_JITTER_PERCENT, RPC_BASE_RETRY_MS, RPC_MAX_RETRIES,
    RPC_MAX_RETRY_MS, USER_AGENT as USER_AGENT_CONST,
};

/// RPC Provider with retry logic and fallback support
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL
    primary_url: String,
    /// Fallback RPC URL (public)
    fallback_url: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
}

impl RpcProvider {
    pub fn new(primary_url: impl Into<String>, fallback_url: Option<String>) -> AppResult<Self> {
        let provider = Self {
            primary_url: primary_url.into(),
            fallback_url,
            client: build_client()?,
        };
        info!("🔗 RPC provider ready ({})", provider.masked_url());
        Ok(provider)
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let primary_err = match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!("⚠️ Primary RPC failed for {}: {}", method, e);
                e
            }
        };

        // Payload errors would repeat on the fallback
        if primary_err.code == ErrorCode::RpcError {
            return Err(primary_err);
        }

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC for {}", method);
            return self.call_with_retry(fallback, &payload).await.map_err(|e| {
                warn!("⚠️ Fallback RPC also failed: {}", e);
                e
            });
        }

        Err(primary_err)
    }

    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        let mut last_error = None;

        for attempt in 0..=RPC_MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay_ms(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt, RPC_MAX_RETRIES, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) if e.code.is_retryable() => {
                    if e.code == ErrorCode::RpcRateLimited {
                        warn!("⏳ Rate limited (HTTP 429), backing off (attempt {})", attempt + 1);
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::rpc_connection_failed("No attempts made")))
    }

    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::rpc_rate_limited());
        }
        if status.is_server_error() {
            return Err(AppError::rpc_connection_failed(format!("HTTP error: {}", status)));
        }
        if !status.is_success() {
            return Err(AppError::rpc_error(format!("HTTP error: {}", status)));
        }

        let json: RpcResponse<T> = response.json().await.map_err(|e| {
            AppError::with_source(ErrorCode::RpcInvalidResponse, "Failed to parse response", e)
        })?;

        if let Some(error) = json.error {
            if error.is_rate_limit() {
                return Err(AppError::rpc_rate_limited());
            }
            return Err(AppError::rpc_error(format!(
                "RPC error: {} (code: {})",
                error.message, error.code
            )));
        }

        json.result
            .ok_or_else(|| AppError::new(ErrorCode::RpcInvalidResponse, "No result in response"))
    }

    /// Number of transactions sent from `address`
    pub async fn transaction_count(&self, address: &EvmAddress) -> AppResult<u64> {
        let params = serde_json::json!([address.as_str(), "latest"]);
        let raw: String = self.call("eth_getTransactionCount", params).await?;
        parse_hex_u64(&raw)
    }

    /// Deployed bytecode, empty for externally owned accounts
    pub async fn get_code(&self, address: &EvmAddress) -> AppResult<Vec<u8>> {
        let params = serde_json::json!([address.as_str(), "latest"]);
        let raw: String = self.call("eth_getCode", params).await?;
        hex::decode(raw.trim_start_matches("0x")).map_err(|e| {
            AppError::with_source(ErrorCode::RpcInvalidResponse, "Bytecode is not hex", e)
        })
    }

    /// Unix timestamp of a block, given as a hex block number
    pub async fn block_timestamp(&self, block_hex: &str) -> AppResult<i64> {
        let params = serde_json::json!([block_hex, false]);
        let block: Option<BlockHeader> = self.call("eth_getBlockByNumber", params).await?;
        let block = block.ok_or_else(|| {
            AppError::new(ErrorCode::RpcInvalidResponse, format!("Block {} not found", block_hex))
        })?;
        let ts = parse_hex_u64(&block.timestamp)?;
        i64::try_from(ts)
            .map_err(|_| AppError::new(ErrorCode::RpcInvalidResponse, "Block timestamp overflow"))
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> String {
        mask_url(&self.primary_url)
    }
}

/// Build HTTP client with custom headers
fn build_client() -> AppResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
        .gzip(true)
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Exponential backoff with ±20% jitter, capped
fn retry_delay_ms(attempt: u32) -> u64 {
    let base_delay = RPC_BASE_RETRY_MS * 2_u64.pow(attempt.saturating_sub(1));
    let capped_delay = base_delay.min(RPC_MAX_RETRY_MS);
    let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 =
        rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (capped_delay as i64 + jitter).max(50) as u64
}

/// Hide everything after /v2/ (the API key)
pub fn mask_url(url: &str) -> String {
    match url.split_once("/v2/") {
        Some((base, _)) => format!("{}/v2/***HIDDEN***", base),
        None => url.to_string(),
    }
}

/// Parse a 0x-prefixed hex quantity
pub fn parse_hex_u64(raw: &str) -> AppResult<u64> {
    let digits = raw.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|_| {
        AppError::new(
            ErrorCode::RpcInvalidResponse,
            format!("Invalid hex quantity: {:?}", raw),
        )
    })
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Rate limit error (HTTP 429 surfaced as code -32005, or by message)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }
}
