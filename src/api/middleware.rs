//! API Middleware (Rate Limiting, Logging)

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{ApiError, ApiResponse};

/// Rate limiter configuration
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,                 // 100 requests
            window_duration: Duration::from_secs(60), // per minute
        }
    }
}

/// In-memory fixed-window rate limiter, keyed by client
pub struct RateLimiter {
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let remaining = self.config.requests_per_window.saturating_sub(entry.0);
        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= self.config.requests_per_window {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        (true, remaining - 1, reset_secs)
    }

    /// Drop clients idle for two windows
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        let max_idle = self.config.window_duration * 2;
        self.requests
            .retain(|_, (_, timestamp)| now.duration_since(*timestamp) < max_idle);
        before.saturating_sub(self.requests.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// Global rate limiter instance
lazy_static::lazy_static! {
    pub static ref RATE_LIMITER: Arc<RateLimiter> = Arc::new(RateLimiter::default());
}

/// Periodically evict idle rate-limit entries
pub fn start_cleanup_task() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = RATE_LIMITER.cleanup();
            if removed > 0 {
                debug!("🧹 Rate limiter cleanup: {} idle clients removed", removed);
            }
        }
    })
}

fn is_health_path(path: &str) -> bool {
    path == "/health" || path == "/v1/health"
}

/// Client identity: first X-Forwarded-For hop, then X-Real-IP, then the peer IP
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|s| s.trim().to_string())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    // Health probes are never limited
    if is_health_path(request.uri().path()) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let rate_key = client_key(&headers, peer);
    let (allowed, remaining, reset) = RATE_LIMITER.check(&rate_key);

    if !allowed {
        warn!(key = %rate_key, "⛔ Rate limit exceeded");
        let body = ApiResponse::error(ApiError::rate_limited(reset), 0.0);
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}
