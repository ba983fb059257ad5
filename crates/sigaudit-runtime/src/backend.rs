//! Application Signals API as consumed by the auditor.
//!
//! Calls are synchronous and one at a time. Implementations decide how a
//! request reaches the service; the in-memory backend in [`crate::memory`]
//! serves fixtures.

use serde::Serialize;
use sigaudit_types::{
    AuditFinding, AuditTarget, AuditorSet, KeyAttributes, ServiceOperation, ServicePage, SloPage,
    TimeRange,
};
use thiserror::Error;

/// Cap on operations fetched per parent service.
pub const MAX_OPERATIONS_PER_SERVICE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListServicesRequest {
    pub time_range: TimeRange,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOperationsRequest {
    pub time_range: TimeRange,
    pub key_attributes: KeyAttributes,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSlosRequest {
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    pub include_linked_accounts: bool,
}

/// One findings call: a time window, up to a batch of targets, and the
/// auditors to run (empty set lets the backend pick all).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRequest {
    pub time_range: TimeRange,
    pub targets: Vec<AuditTarget>,
    pub auditors: AuditorSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} was throttled: {message}")]
    Throttled {
        operation: &'static str,
        message: String,
    },

    #[error("invalid page token: {0}")]
    InvalidToken(String),
}

impl BackendError {
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        BackendError::Api {
            operation,
            message: message.into(),
        }
    }
}

pub trait AppSignalsApi: Send + Sync {
    fn list_services(&self, request: &ListServicesRequest) -> Result<ServicePage, BackendError>;

    fn list_service_operations(
        &self,
        request: &ListOperationsRequest,
    ) -> Result<Vec<ServiceOperation>, BackendError>;

    fn list_service_level_objectives(
        &self,
        request: &ListSlosRequest,
    ) -> Result<SloPage, BackendError>;

    fn list_audit_findings(&self, request: &AuditRequest)
    -> Result<Vec<AuditFinding>, BackendError>;
}
