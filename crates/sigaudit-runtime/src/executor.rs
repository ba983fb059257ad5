//! One-batch-at-a-time execution against the findings API.
//!
//! Session state only moves forward on success:
//!
//! ```text
//! Pending(k) --success--> Pending(k+1) | Completed
//! Pending(k) --failure--> Pending(k)      (retryable)
//! Pending(k) --skip-----> Pending(k+1) | Completed
//! ```

use serde::Serialize;
use sigaudit_engine::{BatchOutcome, plan_batches};
use sigaudit_types::{AuditFinding, AuditTarget};
use std::num::NonZeroUsize;

use crate::backend::{AppSignalsApi, AuditRequest};
use crate::session::{
    AuditParams, BatchFailure, BatchSuccess, SessionId, SessionStatus, SessionStore,
};

pub const SESSION_NOT_FOUND: &str = "Session not found or expired";
pub const NO_MORE_BATCHES: &str = "No more batches to process";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchResult {
    Success {
        batch_index: usize,
        total_batches: usize,
        targets_in_batch: usize,
        targets: Vec<AuditTarget>,
        findings_count: usize,
        findings: Vec<AuditFinding>,
        session_status: SessionStatus,
    },
    Failed {
        batch_index: usize,
        total_batches: usize,
        targets_in_batch: usize,
        error: String,
        retryable: bool,
    },
    #[serde(rename = "completed")]
    Exhausted { error: String },
    NotFound { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SkipResult {
    Skipped {
        batch_index: usize,
        total_batches: usize,
        targets_in_batch: usize,
        reason: String,
        session_status: SessionStatus,
    },
    #[serde(rename = "completed")]
    Exhausted { error: String },
    NotFound { error: String },
}

/// Run the chunk at the session cursor.
///
/// The cursor advances only if the findings call succeeds; a failed batch is
/// reported as retryable and leaves the session untouched.
pub fn execute_next(store: &SessionStore, id: &SessionId, api: &dyn AppSignalsApi) -> BatchResult {
    let Some(session) = store.get(id) else {
        return BatchResult::NotFound {
            error: SESSION_NOT_FOUND.to_string(),
        };
    };
    store.touch(id);

    let Some(chunk) = session.plan.current() else {
        return BatchResult::Exhausted {
            error: NO_MORE_BATCHES.to_string(),
        };
    };
    let position = session.plan.position();
    let batch_index = position + 1;
    let total_batches = session.plan.total();
    let request = AuditRequest {
        time_range: session.params.time_range,
        targets: chunk.to_vec(),
        auditors: session.params.auditors.clone(),
    };

    tracing::info!(
        session_id = %id,
        batch = batch_index,
        total = total_batches,
        targets = request.targets.len(),
        "executing batch"
    );

    let findings = match api.list_audit_findings(&request) {
        Ok(findings) => findings,
        Err(err) => {
            tracing::warn!(session_id = %id, batch = batch_index, error = %err, "batch failed");
            return BatchResult::Failed {
                batch_index,
                total_batches,
                targets_in_batch: request.targets.len(),
                error: err.to_string(),
                retryable: true,
            };
        }
    };

    let targets_in_batch = request.targets.len();
    let applied = store.update(id, |live| {
        if live.plan.position() != position {
            tracing::warn!(session_id = %id, batch = batch_index, "cursor moved during batch; result not recorded");
            return live.status;
        }
        live.plan.advance();
        live.processed.push(BatchSuccess {
            batch_index,
            targets_count: targets_in_batch,
            findings_count: findings.len(),
        });
        live.findings.extend(findings.iter().cloned());
        live.refresh_status();
        live.status
    });

    let session_status = applied.unwrap_or_else(|| {
        tracing::warn!(session_id = %id, "session removed while batch was running");
        if batch_index == total_batches {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }
    });

    BatchResult::Success {
        batch_index,
        total_batches,
        targets_in_batch,
        targets: request.targets,
        findings_count: findings.len(),
        findings,
        session_status,
    }
}

/// Give up on the chunk at the cursor and move on.
///
/// The chunk is recorded as failed so that finalizing reports it.
pub fn skip_current(store: &SessionStore, id: &SessionId, reason: &str) -> SkipResult {
    if store.get(id).is_none() {
        return SkipResult::NotFound {
            error: SESSION_NOT_FOUND.to_string(),
        };
    }
    store.touch(id);

    let skipped = store.update(id, |session| {
        let targets_in_batch = session.plan.current()?.len();
        let batch_index = session.plan.position() + 1;
        session.failed.push(BatchFailure {
            batch_index,
            targets_count: targets_in_batch,
            error: reason.to_string(),
        });
        session.plan.advance();
        session.refresh_status();
        Some(SkipResult::Skipped {
            batch_index,
            total_batches: session.plan.total(),
            targets_in_batch,
            reason: reason.to_string(),
            session_status: session.status,
        })
    });

    match skipped {
        Some(Some(result)) => {
            tracing::info!(session_id = %id, reason, "skipped batch");
            result
        }
        Some(None) => SkipResult::Exhausted {
            error: NO_MORE_BATCHES.to_string(),
        },
        None => SkipResult::NotFound {
            error: SESSION_NOT_FOUND.to_string(),
        },
    }
}

/// Run every chunk in order without a session.
///
/// Failures are recorded and processing continues with the next chunk.
pub fn run_all(
    api: &dyn AppSignalsApi,
    params: &AuditParams,
    targets: &[AuditTarget],
    chunk_size: NonZeroUsize,
) -> Vec<BatchOutcome> {
    let chunks = plan_batches(targets, chunk_size);
    let total = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let batch_index = i + 1;
            let targets_count = chunk.len();
            let request = AuditRequest {
                time_range: params.time_range,
                targets: chunk,
                auditors: params.auditors.clone(),
            };
            tracing::info!(batch = batch_index, total, targets = targets_count, "executing batch");

            match api.list_audit_findings(&request) {
                Ok(findings) => BatchOutcome::Success {
                    batch_index,
                    targets_count,
                    findings,
                },
                Err(err) => {
                    tracing::warn!(batch = batch_index, error = %err, "batch failed");
                    BatchOutcome::Failed {
                        batch_index,
                        targets_count,
                        error: err.to_string(),
                    }
                }
            }
        })
        .collect()
}
