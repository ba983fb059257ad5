//! Batch session query types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sigaudit_engine::Aggregated;
use sigaudit_runtime::{BatchResult, SessionId, SessionProgress, SessionStatus, SkipResult};

/// Identify an interactive audit session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionArgs {
    /// Session id returned by audit_services, audit_service_operations or audit_slos (e.g. "batch-1f0c...")
    pub session_id: String,
}

/// Abandon the batch at the session cursor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipBatchArgs {
    /// Session id of the audit
    pub session_id: String,
    /// Why the batch is skipped; reported by finalize_audit_session
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinueBatchResponse {
    pub session_id: SessionId,
    pub batch: BatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<SessionProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipBatchResponse {
    pub session_id: SessionId,
    pub result: SkipResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<SessionProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizeResponse {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub progress: SessionProgress,
    pub report: Aggregated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelSessionResponse {
    pub session_id: SessionId,
    pub cancelled: bool,
    pub processed_batches: usize,
    pub remaining_batches: usize,
    pub total_findings: usize,
}
