use chrono::Utc;
use std::sync::Arc;

use sigaudit_engine::{
    BatchOutcome, ExecutionMode, PageRequest, PaginationInfo, aggregate, choose_mode,
    clean_page_token, filter_instrumented,
};
use sigaudit_runtime::{
    AppSignalsApi, AuditParams, AuditSettings, BatchResult, BatchSession, Expansion,
    ListServicesRequest, SessionId, SessionProgress, SessionStatus, SessionStore,
    TargetResolver, execute_next, run_all, skip_current,
};
use sigaudit_types::{AuditTarget, Auditor, AuditorSet, TargetKind, TimeRange};

use crate::error::{Error, Result};
use crate::query::{
    AuditMode, AuditOutcome, AuditResponse, AuditServiceOperationsArgs, AuditServicesArgs,
    AuditSlosArgs, CancelSessionResponse, ContinueBatchResponse, ExpansionSummary,
    FinalizeResponse, InstrumentedService, ListInstrumentedServicesArgs,
    ListInstrumentedServicesResponse, SkipBatchResponse, TargetsInput,
};

/// Largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_SKIP_REASON: &str = "Skipped by caller";

/// Per-tool wiring of the shared audit workflow.
struct AuditProfile {
    tool: &'static str,
    kind: TargetKind,
    item_type: &'static str,
    targets_param: &'static str,
    max_param: &'static str,
    default_auditors: &'static [Auditor],
}

const SERVICES: AuditProfile = AuditProfile {
    tool: "audit_services",
    kind: TargetKind::Service,
    item_type: "services",
    targets_param: "service_targets",
    max_param: "max_services",
    default_auditors: &[Auditor::Slo, Auditor::OperationMetric],
};

const SERVICE_OPERATIONS: AuditProfile = AuditProfile {
    tool: "audit_service_operations",
    kind: TargetKind::ServiceOperation,
    item_type: "services",
    targets_param: "operation_targets",
    max_param: "max_services",
    default_auditors: &[Auditor::OperationMetric],
};

const SLOS: AuditProfile = AuditProfile {
    tool: "audit_slos",
    kind: TargetKind::Slo,
    item_type: "slos",
    targets_param: "slo_targets",
    max_param: "max_slos",
    default_auditors: &[Auditor::Slo],
};

struct AuditInput {
    targets: TargetsInput,
    start_time: Option<String>,
    end_time: Option<String>,
    auditors: Option<String>,
    next_token: Option<String>,
    max_results: Option<u32>,
    mode: Option<AuditMode>,
}

#[derive(Clone)]
pub struct Client {
    api: Arc<dyn AppSignalsApi>,
    settings: AuditSettings,
    sessions: Arc<SessionStore>,
}

impl Client {
    pub fn new(
        api: Arc<dyn AppSignalsApi>,
        settings: AuditSettings,
        sessions: SessionStore,
    ) -> Self {
        Self {
            api,
            settings,
            sessions: Arc::new(sessions),
        }
    }

    pub fn settings(&self) -> &AuditSettings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.settings.default_max_results)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn audit_services(&self, args: AuditServicesArgs) -> Result<AuditResponse> {
        self.audit(
            &SERVICES,
            AuditInput {
                targets: args.service_targets,
                start_time: args.start_time,
                end_time: args.end_time,
                auditors: args.auditors,
                next_token: args.next_token,
                max_results: args.max_services,
                mode: args.mode,
            },
        )
    }

    pub fn audit_service_operations(
        &self,
        args: AuditServiceOperationsArgs,
    ) -> Result<AuditResponse> {
        self.audit(
            &SERVICE_OPERATIONS,
            AuditInput {
                targets: args.operation_targets,
                start_time: args.start_time,
                end_time: args.end_time,
                auditors: args.auditors,
                next_token: args.next_token,
                max_results: args.max_services,
                mode: args.mode,
            },
        )
    }

    pub fn audit_slos(&self, args: AuditSlosArgs) -> Result<AuditResponse> {
        self.audit(
            &SLOS,
            AuditInput {
                targets: args.slo_targets,
                start_time: args.start_time,
                end_time: args.end_time,
                auditors: args.auditors,
                next_token: args.next_token,
                max_results: args.max_slos,
                mode: args.mode,
            },
        )
    }

    fn audit(&self, profile: &AuditProfile, input: AuditInput) -> Result<AuditResponse> {
        // Everything the caller sent is validated before the first backend call.
        let time_range = TimeRange::parse(
            input.start_time.as_deref(),
            input.end_time.as_deref(),
            Utc::now(),
        )?;
        let raw_targets = input.targets.into_values(profile.targets_param)?;
        let targets = AuditTarget::parse_all(&raw_targets)?;
        let auditors = AuditorSet::parse(input.auditors.as_deref(), profile.default_auditors)?;

        if let Some(foreign) = targets
            .iter()
            .find(|t| t.kind() != profile.kind && t.has_wildcard())
        {
            return Err(Error::validation(
                profile.targets_param,
                format!(
                    "wildcard {} target '{}' cannot be expanded by {}",
                    foreign.kind().as_str(),
                    foreign.label(),
                    profile.tool
                ),
            ));
        }
        let max_results = self.page_size(input.max_results);
        let expansion = self.expand(
            profile,
            &targets,
            &time_range,
            input.next_token.as_deref(),
            max_results,
        )?;
        // Concrete targets never reach the backend during expansion.
        let lookup_used = expansion.used_lookup();
        if input.next_token.is_some() && !lookup_used {
            return Err(Error::validation(
                "next_token",
                "only valid when targets contain '*' wildcard patterns or name-only services",
            ));
        }

        let pagination = PaginationInfo::build(
            PageRequest {
                tool: profile.tool,
                item_type: profile.item_type,
                time_range: &time_range,
                max_param: profile.max_param,
                max_value: max_results,
            },
            lookup_used,
            expansion.names_in_page.clone(),
            expansion.next_token.clone(),
        );
        let summary = ExpansionSummary {
            requested_targets: targets.len(),
            expanded_targets: expansion.targets.len(),
            patterns: expansion.patterns.clone(),
            unresolved: expansion.unresolved.clone(),
        };

        if expansion.targets.is_empty() {
            if pagination.as_ref().is_none_or(|p| !p.has_more) {
                return Err(Error::NoMatches {
                    kind: profile.kind,
                    patterns: expansion.patterns,
                    names_in_page: expansion.names_in_page,
                    unresolved: expansion.unresolved,
                });
            }
            // Nothing here, but later pages may still match.
            return Ok(AuditResponse {
                outcome: AuditOutcome::Synchronous {
                    report: aggregate(Vec::new()),
                },
                expansion: summary,
                pagination,
            });
        }

        let params = AuditParams {
            time_range,
            auditors,
        };
        let mode = choose_mode(
            expansion.targets.len(),
            self.settings.threshold(),
            input.mode.map(Into::into),
        );
        tracing::info!(
            tool = profile.tool,
            targets = expansion.targets.len(),
            ?mode,
            "running audit"
        );

        let outcome = match mode {
            ExecutionMode::Synchronous => {
                let outcomes = run_all(
                    self.api.as_ref(),
                    &params,
                    &expansion.targets,
                    self.settings.chunk_size(),
                );
                AuditOutcome::Synchronous {
                    report: aggregate(outcomes),
                }
            }
            ExecutionMode::Interactive => self.start_session(expansion.targets, params),
        };

        Ok(AuditResponse {
            outcome,
            expansion: summary,
            pagination,
        })
    }

    fn expand(
        &self,
        profile: &AuditProfile,
        targets: &[AuditTarget],
        time_range: &TimeRange,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<Expansion> {
        let resolver = TargetResolver::new(self.api.as_ref());
        let expansion = match profile.kind {
            TargetKind::Service => {
                resolver.expand_services(targets, time_range, next_token, max_results)
            }
            TargetKind::ServiceOperation => {
                resolver.expand_service_operations(targets, time_range, next_token, max_results)
            }
            TargetKind::Slo => resolver.expand_slos(targets, next_token, max_results),
        }?;
        Ok(expansion)
    }

    fn start_session(&self, targets: Vec<AuditTarget>, params: AuditParams) -> AuditOutcome {
        let session_id = self
            .sessions
            .create(targets, params, self.settings.chunk_size());
        let first_batch = execute_next(&self.sessions, &session_id, self.api.as_ref());
        let progress = self.sessions.get(&session_id).map(|s| s.progress());
        let next_step = next_step(&first_batch, progress.as_ref());

        AuditOutcome::Interactive {
            session_id,
            first_batch,
            progress,
            next_step,
        }
    }

    /// Run the next batch of an interactive session.
    ///
    /// A failed batch is not recorded; calling again retries it.
    pub fn continue_audit_batch(&self, session_id: &str) -> ContinueBatchResponse {
        let id = SessionId::from(session_id);
        let batch = execute_next(&self.sessions, &id, self.api.as_ref());
        let progress = self.sessions.get(&id).map(|s| s.progress());
        ContinueBatchResponse {
            session_id: id,
            batch,
            progress,
        }
    }

    pub fn get_batch_status(&self, session_id: &str) -> Result<SessionProgress> {
        self.session(session_id).map(|s| s.progress())
    }

    /// Aggregate every processed and skipped batch. The session is kept.
    pub fn finalize_audit_session(&self, session_id: &str) -> Result<FinalizeResponse> {
        let session = self.session(session_id)?;
        self.sessions.touch(&session.id);
        let report = aggregate(session_outcomes(&session));
        tracing::info!(session_id = %session.id, status = ?session.status, "finalized batch session");

        Ok(FinalizeResponse {
            session_id: session.id.clone(),
            status: session.status,
            progress: session.progress(),
            report,
        })
    }

    pub fn skip_audit_batch(&self, session_id: &str, reason: Option<&str>) -> SkipBatchResponse {
        let id = SessionId::from(session_id);
        let result = skip_current(&self.sessions, &id, reason.unwrap_or(DEFAULT_SKIP_REASON));
        let progress = self.sessions.get(&id).map(|s| s.progress());
        SkipBatchResponse {
            session_id: id,
            result,
            progress,
        }
    }

    pub fn cancel_audit_session(&self, session_id: &str) -> Result<CancelSessionResponse> {
        let session = self.session(session_id)?;
        self.sessions.delete(&session.id);
        Ok(CancelSessionResponse {
            processed_batches: session.processed.len(),
            remaining_batches: session.plan.remaining(),
            total_findings: session.findings.len(),
            session_id: session.id,
            cancelled: true,
        })
    }

    /// Drop every session; returns how many there were.
    pub fn clear_sessions(&self) -> usize {
        let cleared = self.sessions.delete_all();
        if cleared > 0 {
            tracing::info!(cleared, "cleared batch sessions");
        }
        cleared
    }

    pub fn list_instrumented_services(
        &self,
        args: ListInstrumentedServicesArgs,
    ) -> Result<ListInstrumentedServicesResponse> {
        let time_range = TimeRange::parse(
            args.start_time.as_deref(),
            args.end_time.as_deref(),
            Utc::now(),
        )?;
        let request = ListServicesRequest {
            time_range,
            max_results: self.page_size(args.max_results),
            next_token: clean_page_token(args.next_token.as_deref()),
        };
        let page = self.api.list_services(&request)?;
        let total_in_page = page.services.len();
        let services = filter_instrumented(page.services)
            .iter()
            .map(InstrumentedService::from)
            .collect();

        Ok(ListInstrumentedServicesResponse::new(
            total_in_page,
            services,
            clean_page_token(page.next_token.as_deref()),
        ))
    }

    fn session(&self, session_id: &str) -> Result<BatchSession> {
        self.sessions
            .get(&SessionId::from(session_id))
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }
}

/// Processed and skipped batches in batch order.
fn session_outcomes(session: &BatchSession) -> Vec<BatchOutcome> {
    let mut findings = session.findings.iter().cloned();
    let mut outcomes: Vec<BatchOutcome> = session
        .processed
        .iter()
        .map(|batch| BatchOutcome::Success {
            batch_index: batch.batch_index,
            targets_count: batch.targets_count,
            findings: findings.by_ref().take(batch.findings_count).collect(),
        })
        .collect();
    outcomes.extend(session.failed.iter().map(|batch| BatchOutcome::Failed {
        batch_index: batch.batch_index,
        targets_count: batch.targets_count,
        error: batch.error.clone(),
    }));
    outcomes.sort_by_key(BatchOutcome::batch_index);
    outcomes
}

fn next_step(first_batch: &BatchResult, progress: Option<&SessionProgress>) -> String {
    match (first_batch, progress) {
        (BatchResult::Failed { batch_index, .. }, _) => format!(
            "Batch {batch_index} failed. Call continue_audit_batch to retry it or skip_audit_batch to move on."
        ),
        (_, Some(p)) if p.status == SessionStatus::Completed => {
            "All batches processed. Call finalize_audit_session for the combined report.".to_string()
        }
        (_, Some(p)) => format!(
            "Call continue_audit_batch to process batch {} of {}.",
            p.next_batch.unwrap_or(p.total_batches),
            p.total_batches
        ),
        (_, None) => "Session is no longer available.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigaudit_runtime::{InMemoryBackend, SessionSettings};
    use sigaudit_types::{KeyAttributes, ServiceSummary};

    fn backend(services: usize) -> Arc<InMemoryBackend> {
        Arc::new(
            InMemoryBackend::new()
                .with_services((0..services).map(|i| {
                    ServiceSummary::new(KeyAttributes::service(format!("pay-{i}"), "eks:prod"))
                }))
                .with_synthetic_findings(1),
        )
    }

    fn client(api: Arc<InMemoryBackend>) -> Client {
        Client::new(api, AuditSettings::default(), SessionStore::new(SessionSettings::default()))
    }

    fn services_args(targets: serde_json::Value) -> AuditServicesArgs {
        serde_json::from_value(json!({ "service_targets": targets })).unwrap()
    }

    #[test]
    fn invalid_auditor_fails_before_backend() {
        let api = backend(3);
        let mut args = services_args(json!([{"Type": "service", "Service": "pay*"}]));
        args.auditors = Some("slo,bogus".to_string());

        let err = client(Arc::clone(&api)).audit_services(args).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn next_token_without_lookup_is_rejected() {
        let api = backend(3);
        let mut args = services_args(json!([{
            "Type": "service",
            "Data": {"Service": {"Name": "pay-1", "Environment": "eks:prod"}}
        }]));
        args.next_token = Some("abc".to_string());

        let err = client(Arc::clone(&api)).audit_services(args).unwrap_err();
        assert!(matches!(err, Error::Validation { parameter: "next_token", .. }));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn small_sets_run_synchronously() {
        let response = client(backend(3))
            .audit_services(services_args(json!([{"Type": "service", "Service": "pay*"}])))
            .unwrap();

        let AuditOutcome::Synchronous { report } = response.outcome else {
            panic!("expected synchronous outcome");
        };
        let sigaudit_engine::Aggregated::Report(report) = report else {
            panic!("expected report");
        };
        assert_eq!(report.total_findings, 3);
        assert_eq!(response.expansion.expanded_targets, 3);
        assert!(response.pagination.is_some());
    }

    #[test]
    fn large_sets_start_a_session() {
        let api = backend(12);
        let mut args = services_args(json!([{"Type": "service", "Service": "*"}]));
        args.max_services = Some(100);

        let client = client(api);
        let response = client.audit_services(args).unwrap();
        let AuditOutcome::Interactive {
            session_id,
            first_batch,
            ..
        } = response.outcome
        else {
            panic!("expected interactive outcome");
        };
        assert!(matches!(first_batch, BatchResult::Success { batch_index: 1, .. }));

        let progress = client.get_batch_status(session_id.as_str()).unwrap();
        assert_eq!(progress.total_batches, 3);
        assert_eq!(progress.next_batch, Some(2));
    }

    #[test]
    fn no_match_on_last_page_is_soft_error() {
        let err = client(backend(2))
            .audit_services(services_args(json!([{"Type": "service", "Service": "*billing*"}])))
            .unwrap_err();
        match err {
            Error::NoMatches { names_in_page, .. } => {
                assert_eq!(names_in_page, vec!["pay-0", "pay-1"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn max_results_are_clamped() {
        let client = client(backend(0));
        assert_eq!(client.page_size(None), 5);
        assert_eq!(client.page_size(Some(0)), 1);
        assert_eq!(client.page_size(Some(1000)), 100);
    }

    #[test]
    fn unknown_sessions_are_reported() {
        let client = client(backend(0));
        assert!(matches!(
            client.get_batch_status("batch-nope"),
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            client.continue_audit_batch("batch-nope").batch,
            BatchResult::NotFound { .. }
        ));
    }
}
