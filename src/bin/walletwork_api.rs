//! WalletWork API Server
//!
//! REST API scoring pending wallet transactions before they are signed
//!
//! Usage:
//!   cargo run --bin walletwork_api
//!
//! Environment:
//!   PORT / WALLETWORK_PORT - Server port (default: 8000)
//!   WALLETWORK_HOST        - Server host (default: 0.0.0.0)
//!   ALCHEMY_API_KEY        - Transfer history and contract age
//!   ETHERSCAN_API_KEY      - Contract verification
//!   RUST_LOG               - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use walletwork::api::{create_router, start_cleanup_task, AppState};
use walletwork::utils::constants::{APP_NAME, APP_VERSION};
use walletwork::{
    AnalysisOrchestrator, GuardConfig, KnownMaliciousSet, LiveChainData, TelemetryCollector,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("🛡️ {} API v{}", APP_NAME, APP_VERSION);

    let config = GuardConfig::from_env()?;

    // Process-wide read-only state
    let malicious = Arc::new(KnownMaliciousSet::load(config.malicious_list_path.as_deref())?);
    if malicious.is_empty() {
        warn!("⚠️ Known-malicious list is empty; proximity checks will never match");
    }
    let source = Arc::new(LiveChainData::from_config(&config)?);
    let source_for_shutdown = source.clone();

    let cache_source = source.clone();
    let cleanup_period = config.cache_ttl.max(Duration::from_secs(30));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_period);
        loop {
            interval.tick().await;
            let removed = cache_source.cleanup_caches();
            if removed > 0 {
                debug!("🧹 Provider cache cleanup: {} expired entries removed", removed);
            }
        }
    });

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        source,
        malicious,
        config.analysis.clone(),
    ));

    let telemetry = Arc::new(TelemetryCollector::new());
    let telemetry_for_shutdown = telemetry.clone();

    let state = Arc::new(AppState::new(orchestrator, telemetry));

    // Start background cleanup task for rate limiter
    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("🚀 {} API starting on http://{}", APP_NAME, addr);
    info!("Endpoints:");
    info!("  POST /analyze      - Score a pending transaction");
    info!("  POST /v1/analyze   - Same, versioned");
    info!("  GET  /v1/stats     - Verdict statistics");
    info!("  GET  /v1/health    - Health check");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
        }
    };

    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    // Graceful shutdown sequence
    info!("🛑 Shutdown signal received, cleaning up...");

    let stats = telemetry_for_shutdown.get_stats();
    info!("📊 {}", stats.summary());

    for cache in source_for_shutdown.cache_stats() {
        info!(
            "   Cache {}: {} entries, {:.1}% hit rate",
            cache.name, cache.entries, cache.hit_rate
        );
    }

    match telemetry_for_shutdown.export_stats_json() {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }

    info!("👋 {} API shutdown complete", APP_NAME);

    Ok(())
}
