//! Error types for every layer of the relayer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use super::types::{ErrorDetail, ErrorResponse};

/// Substrings that mark an error as a transient network failure.
///
/// Matching is case-insensitive. The list mirrors what HTTP stacks and RPC
/// gateways put in their error text when a request never reached the node or
/// the reply was lost on the way back.
pub const NETWORK_ERROR_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "curl error 52",
    "empty reply",
    "broken pipe",
    "unexpected eof",
    "end of file before message",
    "network",
    "dns",
    "could not resolve host",
    "error sending request",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "too many requests",
];

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`TransactionError`], stored on action records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionErrorKind {
    Network,
    Rpc,
    Serialization,
    Signing,
    Build,
    OnChain,
}

impl TransactionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Rpc => "rpc",
            Self::Serialization => "serialization",
            Self::Signing => "signing",
            Self::Build => "build",
            Self::OnChain => "on_chain",
        }
    }
}

impl std::fmt::Display for TransactionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure raised while building, signing, sending or confirming a transaction.
///
/// Only [`TransactionError::Network`] is retryable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        logs: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Transaction failed on chain: {0}")]
    OnChain(String),
}

impl TransactionError {
    /// Whether the orchestrator may run the attempt again
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    #[must_use]
    pub fn kind(&self) -> TransactionErrorKind {
        match self {
            Self::Network(_) => TransactionErrorKind::Network,
            Self::Rpc { .. } => TransactionErrorKind::Rpc,
            Self::Serialization(_) => TransactionErrorKind::Serialization,
            Self::Signing(_) => TransactionErrorKind::Signing,
            Self::Build(_) => TransactionErrorKind::Build,
            Self::OnChain(_) => TransactionErrorKind::OnChain,
        }
    }

    /// Program logs attached to an RPC rejection, if any
    #[must_use]
    pub fn logs(&self) -> &[String] {
        match self {
            Self::Rpc { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Returns true when the error text names a transient network condition.
#[must_use]
pub fn is_network_error_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    NETWORK_ERROR_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Classify free-form transport error text.
///
/// Text matching one of [`NETWORK_ERROR_MARKERS`] becomes a retryable
/// [`TransactionError::Network`]; anything else is handed to `otherwise`.
pub fn classify_transport_error(
    text: impl Into<String>,
    otherwise: impl FnOnce(String) -> TransactionError,
) -> TransactionError {
    let text = text.into();
    if is_network_error_text(&text) {
        TransactionError::Network(text)
    } else {
        otherwise(text)
    }
}

/// Request validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Validation failed: {0}")]
    Multiple(String),
}

/// Configuration errors raised while reading the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

/// Read and parse an environment variable.
///
/// Unset is `Ok(None)`; a value that does not parse is an error rather than
/// a silent fallback to the default.
pub fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            Self::Transaction(e) => match e {
                TransactionError::Network(_) => (StatusCode::SERVICE_UNAVAILABLE, "network_error"),
                TransactionError::Rpc { .. } => (StatusCode::BAD_GATEWAY, "rpc_error"),
                TransactionError::Build(_) => (StatusCode::BAD_REQUEST, "build_error"),
                TransactionError::Serialization(_) => {
                    (StatusCode::BAD_GATEWAY, "serialization_error")
                }
                TransactionError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "signing_error"),
                TransactionError::OnChain(_) => (StatusCode::UNPROCESSABLE_ENTITY, "on_chain_error"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
