use serde::Serialize;
use sigaudit_types::AuditFinding;

pub const NO_BATCHES_MESSAGE: &str = "No findings from any batch";

/// Result of one findings call, indexed from 1.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Success {
        batch_index: usize,
        targets_count: usize,
        findings: Vec<AuditFinding>,
    },
    Failed {
        batch_index: usize,
        targets_count: usize,
        error: String,
    },
}

impl BatchOutcome {
    pub fn batch_index(&self) -> usize {
        match self {
            BatchOutcome::Success { batch_index, .. }
            | BatchOutcome::Failed { batch_index, .. } => *batch_index,
        }
    }

    pub fn targets_count(&self) -> usize {
        match self {
            BatchOutcome::Success { targets_count, .. }
            | BatchOutcome::Failed { targets_count, .. } => *targets_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub batch_index: usize,
    pub error: String,
    pub targets_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
    pub total_findings: usize,
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub total_targets_processed: usize,
    pub batch_errors: Vec<BatchError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Aggregated {
    NoBatches { message: String },
    Report(AuditReport),
}

/// Combine batch outcomes in batch order.
///
/// Failed batches are kept as [`BatchError`]s. `total_targets_processed`
/// counts targets of successful batches only.
pub fn aggregate(outcomes: impl IntoIterator<Item = BatchOutcome>) -> Aggregated {
    let mut report = AuditReport {
        findings: Vec::new(),
        total_findings: 0,
        total_batches: 0,
        successful_batches: 0,
        failed_batches: 0,
        total_targets_processed: 0,
        batch_errors: Vec::new(),
    };

    for outcome in outcomes {
        report.total_batches += 1;
        match outcome {
            BatchOutcome::Success {
                targets_count,
                findings,
                ..
            } => {
                report.successful_batches += 1;
                report.total_targets_processed += targets_count;
                report.findings.extend(findings);
            }
            BatchOutcome::Failed {
                batch_index,
                targets_count,
                error,
            } => {
                report.failed_batches += 1;
                report.batch_errors.push(BatchError {
                    batch_index,
                    error,
                    targets_count,
                });
            }
        }
    }

    if report.total_batches == 0 {
        return Aggregated::NoBatches {
            message: NO_BATCHES_MESSAGE.to_string(),
        };
    }
    report.total_findings = report.findings.len();
    Aggregated::Report(report)
}
