//! Configuration module
//!
//! Values come from the environment with defaults from utils/constants.rs.
//! No hardcoded endpoints or timings in this file.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    build_alchemy_url, DEFAULT_ANALYSIS_DEADLINE_MS, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_COUNTERPARTY_FANOUT, DEFAULT_EXPLORER_API_URL, DEFAULT_MAX_GRAPH_NODES,
    DEFAULT_MAX_HOP_DEPTH, DEFAULT_PORT, DEFAULT_SIGNAL_TIMEOUT_MS,
    DEFAULT_TRANSFER_HISTORY_LIMIT, PUBLIC_RPC_FALLBACK,
};

/// Knobs of the analysis pipeline itself
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Timeout for each individual signal call
    pub signal_timeout: Duration,
    /// Deadline for the whole collection phase
    pub analysis_deadline: Duration,
    /// BFS depth cap
    pub max_hop_depth: u32,
    /// Counterparties expanded one layer out
    pub counterparty_fanout: usize,
    /// Node cap for the per-request graph
    pub max_graph_nodes: usize,
    /// Transfers fetched per address
    pub transfer_history_limit: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            signal_timeout: Duration::from_millis(DEFAULT_SIGNAL_TIMEOUT_MS),
            analysis_deadline: Duration::from_millis(DEFAULT_ANALYSIS_DEADLINE_MS),
            max_hop_depth: DEFAULT_MAX_HOP_DEPTH,
            counterparty_fanout: DEFAULT_COUNTERPARTY_FANOUT,
            max_graph_nodes: DEFAULT_MAX_GRAPH_NODES,
            transfer_history_limit: DEFAULT_TRANSFER_HISTORY_LIMIT,
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Primary JSON-RPC URL
    pub rpc_url: String,
    /// Public fallback JSON-RPC URL
    pub fallback_rpc_url: Option<String>,
    /// Enables the transfer-history and contract-age sources
    pub alchemy_api_key: Option<String>,
    /// Enables the verification source
    pub etherscan_api_key: Option<String>,
    /// Etherscan-compatible API base URL
    pub explorer_api_url: String,
    /// Known-malicious list; the built-in list is used when unset
    pub malicious_list_path: Option<PathBuf>,
    /// Provider cache TTL
    pub cache_ttl: Duration,
    pub host: String,
    pub port: u16,
    pub analysis: AnalysisConfig,
}

impl GuardConfig {
    /// Load from environment variables
    pub fn from_env() -> AppResult<Self> {
        let alchemy_api_key = env_key("ALCHEMY_API_KEY");
        let etherscan_api_key = env_key("ETHERSCAN_API_KEY");

        if alchemy_api_key.is_some() {
            info!("🔑 ALCHEMY_API_KEY configured (key hidden for security)");
        }
        if etherscan_api_key.is_some() {
            info!("🔑 ETHERSCAN_API_KEY configured (key hidden for security)");
        }

        let rpc_url = std::env::var("ETH_HTTP_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| alchemy_api_key.as_deref().map(build_alchemy_url))
            .unwrap_or_else(|| PUBLIC_RPC_FALLBACK.to_string());

        let fallback_rpc_url = if rpc_url == PUBLIC_RPC_FALLBACK {
            None
        } else {
            Some(PUBLIC_RPC_FALLBACK.to_string())
        };

        let analysis = AnalysisConfig {
            signal_timeout: Duration::from_millis(env_parse(
                "SIGNAL_TIMEOUT_MS",
                DEFAULT_SIGNAL_TIMEOUT_MS,
            )?),
            analysis_deadline: Duration::from_millis(env_parse(
                "ANALYSIS_DEADLINE_MS",
                DEFAULT_ANALYSIS_DEADLINE_MS,
            )?),
            max_hop_depth: env_parse("MAX_HOP_DEPTH", DEFAULT_MAX_HOP_DEPTH)?,
            counterparty_fanout: env_parse("COUNTERPARTY_FANOUT", DEFAULT_COUNTERPARTY_FANOUT)?,
            max_graph_nodes: env_parse("MAX_GRAPH_NODES", DEFAULT_MAX_GRAPH_NODES)?,
            transfer_history_limit: env_parse(
                "TRANSFER_HISTORY_LIMIT",
                DEFAULT_TRANSFER_HISTORY_LIMIT,
            )?,
        };

        // Railway-style PORT wins over the app-specific variable
        let port = match std::env::var("PORT").or_else(|_| std::env::var("WALLETWORK_PORT")) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            rpc_url,
            fallback_rpc_url,
            alchemy_api_key,
            etherscan_api_key,
            explorer_api_url: std::env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_API_URL.to_string()),
            malicious_list_path: std::env::var("WALLETWORK_MALICIOUS_LIST")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?),
            host: std::env::var("WALLETWORK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            analysis,
        })
    }
}

/// Read an API key, ignoring empty and placeholder values
fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|k| !k.is_empty() && k != "YOUR_API_KEY")
}

fn env_parse<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::invalid_config(name, &raw)),
        _ => Ok(default),
    }
}
