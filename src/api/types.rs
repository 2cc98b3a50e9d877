//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::{AppError, RiskLevel, Verdict};
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper for service endpoints and errors
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Analysis
// ============================================

/// Raw inbound body; validated into an `AnalysisRequest` by the handler
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequestBody {
    pub wallet: String,
    pub contract: String,
    pub tx_type: String,
}

/// Wire form of a verdict
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    pub risk: RiskLevel,
    pub risk_score: u8,
    /// Same value as `risk_score`, kept for older clients
    pub score: u8,
    pub reasons: Vec<String>,
    pub signals: SignalsResponse,
    /// RFC 3339, UTC
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SignalsResponse {
    pub is_new_wallet: bool,
    pub is_unverified_contract: bool,
    pub graph_hop_distance: i32,
    pub drain_probability: f64,
    pub contract_age_days: Option<u64>,
}

impl From<&Verdict> for AnalyzeResponse {
    fn from(verdict: &Verdict) -> Self {
        let signals = verdict.signals();
        Self {
            risk: verdict.risk_level(),
            risk_score: verdict.score(),
            score: verdict.score(),
            reasons: verdict.reasons().to_vec(),
            signals: SignalsResponse {
                is_new_wallet: signals.is_new_wallet(),
                is_unverified_contract: signals.is_unverified_contract(),
                graph_hop_distance: signals.hop_distance,
                drain_probability: signals.drain.probability,
                contract_age_days: signals.contract_age_days,
            },
            timestamp: verdict
                .timestamp()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

// ============================================
// Health & Stats
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Known-malicious list loaded and non-empty
    pub ready: bool,
    pub malicious_addresses: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub telemetry: TelemetryStats,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignalBundle, TxType};
    use chrono::TimeZone;

    #[test]
    fn test_verdict_wire_shape() {
        let mut bundle = SignalBundle::new(TxType::Approve);
        bundle.tx_count = Some(0);
        bundle.contract_verified = Some(false);
        let ts = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let verdict = Verdict::new(90, vec!["a".into()], bundle, ts);

        let json = serde_json::to_value(AnalyzeResponse::from(&verdict)).unwrap();
        assert_eq!(json["risk"], "DANGEROUS");
        assert_eq!(json["risk_score"], 90);
        assert_eq!(json["score"], 90);
        assert_eq!(json["signals"]["is_new_wallet"], true);
        assert_eq!(json["signals"]["is_unverified_contract"], true);
        assert_eq!(json["signals"]["graph_hop_distance"], -1);
        assert!(json["signals"]["contract_age_days"].is_null());
        assert_eq!(json["timestamp"], "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_app_error_maps_to_api_error() {
        let err = AppError::invalid_tx_type("bad");
        let api: ApiError = (&err).into();
        assert_eq!(api.code, "API_INVALID_TX_TYPE");
    }
}
