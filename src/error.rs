//! Error types for the caching agent
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Agent Error Enum ==
/// Unified error type for the caching agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Upstream fetch was rejected or aborted
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Navigation fetch exceeded its wall-clock bound
    #[error("Timed out after {0}ms")]
    TimeoutExpired(u64),

    /// No entry stored for the request
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    /// Entry present but past its partition's max age
    #[error("Stale entry: {0}")]
    StaleEntry(String),

    /// Response was not cacheable and was not stored
    #[error("Write skipped: {0}")]
    WriteSkipped(String),

    /// Malformed inbound request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Snapshot could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            AgentError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            AgentError::TimeoutExpired(_) => StatusCode::GATEWAY_TIMEOUT,
            AgentError::CacheMiss(_) | AgentError::StaleEntry(_) => StatusCode::NOT_FOUND,
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::WriteSkipped(_) | AgentError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching agent.
pub type Result<T> = std::result::Result<T, AgentError>;
