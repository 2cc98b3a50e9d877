//! Centralized Error Handling Module
//!
//! Every failure carries a unique code so logs can be grepped and alerted on.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: upstream data provider errors
//! - API_xxx: request/validation errors
//! - ANALYSIS_xxx: faults inside the scoring pipeline
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// True for malformed requests, the only failures that cross the API boundary
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ApiBadRequest | ErrorCode::InvalidAddress | ErrorCode::InvalidTxType
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // RPC / Provider Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// Invalid RPC response
    RpcInvalidResponse,
    /// Block explorer API error
    ExplorerError,
    /// External service timeout
    ExternalTimeout,

    // ============================================
    // API / Validation Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Address is not 0x + 40 hex characters
    InvalidAddress,
    /// tx_type outside transfer/swap/approve
    InvalidTxType,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Analysis Errors
    // ============================================
    /// Unexpected fault during graph/simulate/score phases
    AnalysisFault,
    /// Transfer graph exceeded the configured node cap
    GraphTooLarge,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Missing API key
    ConfigMissingApiKey,
    /// Known-malicious list could not be read
    ConfigMaliciousList,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // RPC / Provider
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",
            Self::ExplorerError => "EXPLORER_ERROR",
            Self::ExternalTimeout => "EXTERNAL_TIMEOUT",

            // API / Validation
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::InvalidAddress => "API_INVALID_ADDRESS",
            Self::InvalidTxType => "API_INVALID_TX_TYPE",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            // Analysis
            Self::AnalysisFault => "ANALYSIS_FAULT",
            Self::GraphTooLarge => "ANALYSIS_GRAPH_TOO_LARGE",

            // Configuration
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",
            Self::ConfigMaliciousList => "CFG_MALICIOUS_LIST",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::InvalidAddress | Self::InvalidTxType => 400,
            Self::ConfigMissingApiKey => 401,
            Self::ApiRateLimited | Self::RpcRateLimited => 429,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout
                | Self::RpcRateLimited
                | Self::RpcConnectionFailed
                | Self::ExternalTimeout
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// RPC connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// RPC timeout
    pub fn rpc_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    /// RPC rate limited
    pub fn rpc_rate_limited() -> Self {
        Self::new(ErrorCode::RpcRateLimited, "Rate limited (HTTP 429)")
    }

    /// RPC returned an error payload
    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    /// Malformed address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    /// Unknown transaction category
    pub fn invalid_tx_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTxType, msg)
    }

    /// Missing API key
    pub fn missing_api_key(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            format!("Missing API key: {}", key_name),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }

    /// Explorer error
    pub fn explorer_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExplorerError, msg)
    }

    /// Fault inside the scoring pipeline
    pub fn analysis_fault(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AnalysisFault, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ExternalTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            Self::rpc_rate_limited()
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}
