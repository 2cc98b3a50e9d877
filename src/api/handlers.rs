//! API Request Handlers

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::types::*;
use crate::core::orchestrator::AnalysisOrchestrator;
use crate::models::AnalysisRequest;
use crate::utils::telemetry::TelemetryCollector;

/// Shared application state
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub telemetry: Arc<TelemetryCollector>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, telemetry: Arc<TelemetryCollector>) -> Self {
        Self {
            orchestrator,
            telemetry,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();
    let malicious_addresses = state.orchestrator.malicious_set().len();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        ready: malicious_addresses > 0,
        malicious_addresses,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let data = StatsData {
        telemetry: state.telemetry.get_stats(),
        uptime_seconds: state.uptime_seconds(),
    };
    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Analysis
// ============================================

/// POST /analyze
///
/// Only malformed requests fail; every accepted request gets a verdict.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequestBody>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ErrorReply> {
    let start = Instant::now();

    let Json(body) = body.map_err(|rejection| {
        state.telemetry.record_rejected();
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("Malformed request body", Some(rejection.body_text())),
                elapsed_ms(start),
            )),
        )
    })?;

    let request =
        AnalysisRequest::parse(&body.wallet, &body.contract, &body.tx_type).map_err(|e| {
            debug!("Rejected request: {}", e);
            state.telemetry.record_rejected();
            let status =
                StatusCode::from_u16(e.code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
            (
                status,
                Json(ApiResponse::error(ApiError::from(&e), elapsed_ms(start))),
            )
        })?;

    let verdict = state.orchestrator.analyze(request).await;

    state.telemetry.record_verdict(
        verdict.risk_level(),
        verdict.is_degraded(),
        &verdict.signals().unavailable,
        start.elapsed().as_millis() as u64,
    );

    Ok(Json(AnalyzeResponse::from(&verdict)))
}
