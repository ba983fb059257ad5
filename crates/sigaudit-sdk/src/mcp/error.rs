use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Error;

/// Structured error response for MCP tools
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct McpError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context (e.g., the patterns that matched nothing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Whether the operation can be retried
    pub retryable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Parameter validation failed
    InvalidParameter,
    /// Target patterns matched nothing in the looked-up page
    NoMatches,
    /// Entity lookup for pattern expansion failed
    ExpansionFailed,
    /// Backend call failed
    BackendError,
    /// Batch session id unknown or expired
    SessionNotFound,
    /// Internal server error
    InternalError,
}

impl McpError {
    pub fn invalid_parameter(param_name: &str, reason: &str) -> Self {
        Self {
            code: ErrorCode::InvalidParameter,
            message: format!("Invalid parameter '{}': {}", param_name, reason),
            details: Some(json!({
                "parameter": param_name,
                "reason": reason,
            })),
            retryable: false,
        }
    }

    pub fn session_not_found(session_id: &str) -> Self {
        Self {
            code: ErrorCode::SessionNotFound,
            message: format!("Session not found or expired: {}", session_id),
            details: Some(json!({ "session_id": session_id })),
            retryable: false,
        }
    }

    pub fn internal_error(message: String) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message,
            details: None,
            retryable: true,
        }
    }
}

fn no_match_hint(kind: &str) -> &'static str {
    match kind {
        "slo" => "Use a broader pattern such as '*' to see SLO names, or continue with the next page.",
        _ => "Call list_instrumented_services to see auditable services, or continue with the next page.",
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Validation { parameter, reason } => Self::invalid_parameter(parameter, &reason),
            Error::NoMatches {
                kind,
                patterns,
                names_in_page,
                unresolved,
            } => Self {
                code: ErrorCode::NoMatches,
                message,
                details: Some(json!({
                    "kind": kind,
                    "patterns": patterns,
                    "names_in_page": names_in_page,
                    "unresolved": unresolved,
                    "hint": no_match_hint(kind.as_str()),
                })),
                retryable: false,
            },
            Error::Expansion(err) => Self {
                code: ErrorCode::ExpansionFailed,
                message,
                details: Some(json!({
                    "kind": err.kind,
                    "patterns": err.patterns,
                    "cause": err.source.to_string(),
                })),
                retryable: true,
            },
            Error::Backend(_) => Self {
                code: ErrorCode::BackendError,
                message,
                details: None,
                retryable: true,
            },
            Error::SessionNotFound(session_id) => Self::session_not_found(&session_id),
            Error::Internal(_) => Self::internal_error(message),
        }
    }
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for McpError {}
