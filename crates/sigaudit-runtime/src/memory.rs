//! Fixture-backed [`AppSignalsApi`] used by tests and offline mode.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use sigaudit_types::{
    AuditFinding, ServiceOperation, ServicePage, ServiceSummary, SloPage, SloSummary,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::backend::{
    AppSignalsApi, AuditRequest, BackendError, ListOperationsRequest, ListServicesRequest,
    ListSlosRequest,
};
use crate::{Error, Result};

/// A backend call as seen by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ListServices {
        max_results: u32,
        next_token: Option<String>,
    },
    ListOperations {
        service: String,
    },
    ListSlos {
        max_results: u32,
        next_token: Option<String>,
    },
    Audit {
        targets: Vec<String>,
    },
}

/// On-disk fixture layout.
///
/// ```json
/// {
///   "services": [{"KeyAttributes": {"Type": "Service", "Name": "checkout", "Environment": "eks:prod"}}],
///   "operations": {"checkout": [{"Name": "GET /cart", "MetricReferences": [{"MetricType": "Latency"}]}]},
///   "slos": [{"Name": "checkout-latency"}],
///   "findings": {"checkout": [{"Severity": "HIGH"}]}
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub services: Vec<ServiceSummary>,
    pub operations: HashMap<String, Vec<ServiceOperation>>,
    pub slos: Vec<SloSummary>,
    pub findings: HashMap<String, Vec<AuditFinding>>,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    services: Vec<ServiceSummary>,
    operations: HashMap<String, Vec<ServiceOperation>>,
    slos: Vec<SloSummary>,
    findings: HashMap<String, Vec<AuditFinding>>,
    synthetic_findings_per_target: usize,
    failing_audits: AtomicUsize,
    failing_lookups: AtomicUsize,
    failing_operation_services: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            services: fixture.services,
            operations: fixture.operations,
            slos: fixture.slos,
            findings: fixture.findings,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content).map_err(|e| Error::Fixture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!(
            path = %path.display(),
            services = fixture.services.len(),
            slos = fixture.slos.len(),
            "loaded fixture backend"
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_services(mut self, services: impl IntoIterator<Item = ServiceSummary>) -> Self {
        self.services.extend(services);
        self
    }

    pub fn with_operations(
        mut self,
        service: impl Into<String>,
        operations: impl IntoIterator<Item = ServiceOperation>,
    ) -> Self {
        self.operations
            .entry(service.into())
            .or_default()
            .extend(operations);
        self
    }

    pub fn with_slos(mut self, slos: impl IntoIterator<Item = SloSummary>) -> Self {
        self.slos.extend(slos);
        self
    }

    /// Findings returned whenever a target with this label is audited.
    pub fn with_findings(
        mut self,
        label: impl Into<String>,
        findings: impl IntoIterator<Item = AuditFinding>,
    ) -> Self {
        self.findings.entry(label.into()).or_default().extend(findings);
        self
    }

    /// Emit `count` generated findings for targets without explicit ones.
    pub fn with_synthetic_findings(mut self, count: usize) -> Self {
        self.synthetic_findings_per_target = count;
        self
    }

    /// Operation lookups for this service fail.
    pub fn with_failing_operations(mut self, service: impl Into<String>) -> Self {
        self.failing_operation_services.push(service.into());
        self
    }

    /// The next `count` findings calls fail.
    pub fn fail_next_audits(&self, count: usize) {
        self.failing_audits.store(count, Ordering::SeqCst);
    }

    /// The next `count` service or SLO page lookups fail.
    pub fn fail_next_lookups(&self, count: usize) {
        self.failing_lookups.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn audit_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Audit { .. }))
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn encode_offset(offset: usize) -> String {
    STANDARD.encode(format!("offset:{offset}"))
}

fn decode_offset(token: Option<&str>) -> std::result::Result<usize, BackendError> {
    let Some(token) = token else {
        return Ok(0);
    };
    let invalid = || BackendError::InvalidToken(token.to_string());
    let bytes = STANDARD.decode(token).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.strip_prefix("offset:")
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)
}

fn page<T: Clone>(
    items: &[T],
    max_results: u32,
    token: Option<&str>,
) -> std::result::Result<(Vec<T>, Option<String>), BackendError> {
    let offset = decode_offset(token)?.min(items.len());
    let end = offset
        .saturating_add(max_results.max(1) as usize)
        .min(items.len());
    let next = (end < items.len()).then(|| encode_offset(end));
    Ok((items[offset..end].to_vec(), next))
}

impl AppSignalsApi for InMemoryBackend {
    fn list_services(
        &self,
        request: &ListServicesRequest,
    ) -> std::result::Result<ServicePage, BackendError> {
        self.record(RecordedCall::ListServices {
            max_results: request.max_results,
            next_token: request.next_token.clone(),
        });
        if Self::take_failure(&self.failing_lookups) {
            return Err(BackendError::api("ListServices", "service unavailable"));
        }

        let (services, next_token) =
            page(&self.services, request.max_results, request.next_token.as_deref())?;
        Ok(ServicePage {
            services,
            next_token,
        })
    }

    fn list_service_operations(
        &self,
        request: &ListOperationsRequest,
    ) -> std::result::Result<Vec<ServiceOperation>, BackendError> {
        let service = request.key_attributes.name().to_string();
        self.record(RecordedCall::ListOperations {
            service: service.clone(),
        });
        if self.failing_operation_services.contains(&service) {
            return Err(BackendError::api(
                "ListServiceOperations",
                format!("access denied for {service}"),
            ));
        }

        let mut operations = self.operations.get(&service).cloned().unwrap_or_default();
        operations.truncate(request.max_results as usize);
        Ok(operations)
    }

    fn list_service_level_objectives(
        &self,
        request: &ListSlosRequest,
    ) -> std::result::Result<SloPage, BackendError> {
        self.record(RecordedCall::ListSlos {
            max_results: request.max_results,
            next_token: request.next_token.clone(),
        });
        if Self::take_failure(&self.failing_lookups) {
            return Err(BackendError::api("ListServiceLevelObjectives", "service unavailable"));
        }

        let (slos, next_token) =
            page(&self.slos, request.max_results, request.next_token.as_deref())?;
        Ok(SloPage { slos, next_token })
    }

    fn list_audit_findings(
        &self,
        request: &AuditRequest,
    ) -> std::result::Result<Vec<AuditFinding>, BackendError> {
        let labels: Vec<String> = request.targets.iter().map(|t| t.label()).collect();
        self.record(RecordedCall::Audit {
            targets: labels.clone(),
        });
        if Self::take_failure(&self.failing_audits) {
            return Err(BackendError::Throttled {
                operation: "ListAuditFindings",
                message: "Rate exceeded".to_string(),
            });
        }

        let mut findings = Vec::new();
        for label in labels {
            match self.findings.get(&label) {
                Some(explicit) => findings.extend(explicit.iter().cloned()),
                None => findings.extend((0..self.synthetic_findings_per_target).map(|i| {
                    AuditFinding::new(json!({
                        "Target": label,
                        "Sequence": i,
                        "Auditors": request.auditors.names(),
                    }))
                })),
            }
        }
        Ok(findings)
    }
}
