use serde_json::json;
use sigaudit_engine::Aggregated;
use sigaudit_runtime::{
    AppSignalsApi, AuditRequest, AuditSettings, BackendError, InMemoryBackend,
    ListOperationsRequest, ListServicesRequest, ListSlosRequest, RecordedCall, SessionSettings,
    SessionStore,
};
use sigaudit_sdk::Client;
use sigaudit_sdk::Error;
use sigaudit_sdk::query::{
    AuditOutcome, AuditServiceOperationsArgs, AuditServicesArgs, AuditSlosArgs,
    ListInstrumentedServicesArgs,
};
use sigaudit_testing::{TestWorld, fixtures};
use sigaudit_types::{AuditFinding, ServiceOperation, ServicePage, SloPage};
use std::sync::Arc;

fn services_args(arguments: serde_json::Value) -> AuditServicesArgs {
    serde_json::from_value(arguments).unwrap()
}

fn report(outcome: AuditOutcome) -> sigaudit_engine::AuditReport {
    match outcome {
        AuditOutcome::Synchronous {
            report: Aggregated::Report(report),
        } => report,
        other => panic!("expected a synchronous report, got {other:?}"),
    }
}

#[test]
fn contains_pattern_expands_within_one_page() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let response = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "*Pay*"}]
        })))
        .unwrap();

    assert_eq!(response.expansion.expanded_targets, 3);
    let pagination = response.pagination.clone().unwrap();
    assert!(pagination.has_more);
    assert_eq!(pagination.names_in_page.len(), 5);
    assert_eq!(pagination.resume.unwrap().max_param, "max_services");

    let report = report(response.outcome);
    assert_eq!(report.total_targets_processed, 3);
    assert_eq!(world.backend().audit_calls(), 1);
}

#[test]
fn next_page_continues_from_the_token() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let first = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "*"}]
        })))
        .unwrap();
    let token = first.pagination.unwrap().next_token.unwrap();

    let second = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "*"}],
            "next_token": token
        })))
        .unwrap();

    // legacy-ledger is the only service left.
    assert_eq!(second.expansion.expanded_targets, 1);
    assert!(!second.pagination.unwrap().has_more);
}

#[test]
fn inexact_name_resolves_to_best_candidate() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let response = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "payment-api"}]
        })))
        .unwrap();

    assert_eq!(response.expansion.expanded_targets, 1);
    assert!(response.pagination.unwrap().has_more);
    let report = report(response.outcome);
    assert_eq!(report.findings[0].0["Target"], "payment-api");
}

#[test]
fn operation_wildcards_filter_by_metric_family() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let args: AuditServiceOperationsArgs = serde_json::from_value(json!({
        "operation_targets": [{
            "Type": "service_operation",
            "Data": {"ServiceOperation": {
                "Service": {"Type": "Service", "Name": "payment-api"},
                "Operation": "*payments*",
                "MetricType": "Availability"
            }}
        }]
    }))
    .unwrap();

    let response = world.client().audit_service_operations(args).unwrap();
    // Only GET /payments reports Fault, which satisfies Availability.
    assert_eq!(response.expansion.expanded_targets, 1);
    assert!(
        world
            .backend()
            .calls()
            .contains(&RecordedCall::ListOperations {
                service: "payment-api".to_string()
            })
    );
}

#[test]
fn slo_wildcards_expand_against_slo_page() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let args: AuditSlosArgs = serde_json::from_value(json!({
        "slo_targets": [{"Type": "slo", "Data": {"Slo": {"SloName": "payment*"}}}]
    }))
    .unwrap();

    let response = world.client().audit_slos(args).unwrap();
    assert_eq!(response.expansion.expanded_targets, 2);
    assert_eq!(response.pagination.unwrap().item_type, "slos");
}

#[test]
fn lookup_failure_is_an_expansion_error() {
    let world = TestWorld::new(fixtures::payment_catalog());
    world.backend().fail_next_lookups(1);

    let err = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "*"}]
        })))
        .unwrap_err();
    assert!(matches!(err, Error::Expansion(_)));
    assert_eq!(world.backend().audit_calls(), 0);
}

#[test]
fn wildcard_of_another_kind_is_rejected() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let err = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "slo", "Data": {"Slo": {"SloName": "*"}}}]
        })))
        .unwrap_err();
    assert!(matches!(err, Error::Validation { parameter: "service_targets", .. }));
    assert!(world.backend().calls().is_empty());
}

#[test]
fn instrumented_listing_drops_uninstrumented_services() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let response = world
        .client()
        .list_instrumented_services(ListInstrumentedServicesArgs {
            max_results: Some(10),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(response.total_in_page, 6);
    assert_eq!(response.instrumented_in_page, 5);
    assert!(response.services.iter().all(|s| s.name != "legacy-ledger"));
    assert!(response.next_token.is_none());
}

/// Seven services; `payment-service` only shows up on the second page.
fn late_payment_service() -> TestWorld {
    let mut services = fixtures::numbered_services("svc", 6);
    services.push(fixtures::service("payment-service", fixtures::PROD));
    TestWorld::new(
        InMemoryBackend::new()
            .with_services(services)
            .with_synthetic_findings(1),
    )
}

#[test]
fn name_only_target_on_a_later_page_can_be_reached() {
    let world = late_payment_service();
    let target = json!([{"Type": "service", "Service": "payment-service"}]);

    let first = world
        .client()
        .audit_services(services_args(json!({ "service_targets": target })))
        .unwrap();
    assert_eq!(first.expansion.unresolved, vec!["payment-service"]);
    assert!(matches!(
        first.outcome,
        AuditOutcome::Synchronous {
            report: Aggregated::NoBatches { .. }
        }
    ));
    let pagination = first.pagination.unwrap();
    assert!(pagination.has_more);
    assert_eq!(world.backend().audit_calls(), 0);

    let second = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": target,
            "next_token": pagination.next_token.unwrap()
        })))
        .unwrap();
    assert!(second.expansion.unresolved.is_empty());
    let report = report(second.outcome);
    assert_eq!(report.total_findings, 1);
    assert_eq!(report.findings[0].0["Target"], "payment-service");
}

#[test]
fn name_only_target_missing_from_the_last_page_is_no_matches() {
    let world = TestWorld::new(
        InMemoryBackend::new().with_services(fixtures::numbered_services("svc", 3)),
    );
    let err = world
        .client()
        .audit_services(services_args(json!({
            "service_targets": [{"Type": "service", "Service": "payment-service"}]
        })))
        .unwrap_err();

    match err {
        Error::NoMatches { unresolved, .. } => assert_eq!(unresolved, vec!["payment-service"]),
        other => panic!("expected no matches, got {other:?}"),
    }
    assert_eq!(world.backend().audit_calls(), 0);
}

/// Answers the first services lookup with an empty page that still has a token.
struct EmptyFirstPage {
    inner: InMemoryBackend,
}

const SECOND_PAGE: &str = "PAGE2TOKEN";

impl AppSignalsApi for EmptyFirstPage {
    fn list_services(&self, request: &ListServicesRequest) -> Result<ServicePage, BackendError> {
        match request.next_token.as_deref() {
            None => Ok(ServicePage {
                services: Vec::new(),
                next_token: Some(SECOND_PAGE.to_string()),
            }),
            Some(SECOND_PAGE) => self.inner.list_services(&ListServicesRequest {
                next_token: None,
                ..request.clone()
            }),
            Some(other) => Err(BackendError::InvalidToken(other.to_string())),
        }
    }

    fn list_service_operations(
        &self,
        request: &ListOperationsRequest,
    ) -> Result<Vec<ServiceOperation>, BackendError> {
        self.inner.list_service_operations(request)
    }

    fn list_service_level_objectives(
        &self,
        request: &ListSlosRequest,
    ) -> Result<SloPage, BackendError> {
        self.inner.list_service_level_objectives(request)
    }

    fn list_audit_findings(
        &self,
        request: &AuditRequest,
    ) -> Result<Vec<AuditFinding>, BackendError> {
        self.inner.list_audit_findings(request)
    }
}

#[test]
fn empty_page_with_token_keeps_pagination() {
    let api = Arc::new(EmptyFirstPage {
        inner: InMemoryBackend::new()
            .with_services([fixtures::service("payment", fixtures::PROD)])
            .with_synthetic_findings(1),
    });
    let client = Client::new(
        api,
        AuditSettings::default(),
        SessionStore::new(SessionSettings::default()),
    );
    let target = json!([{"Type": "service", "Service": "*pay*"}]);

    let first = client
        .audit_services(services_args(json!({ "service_targets": target })))
        .unwrap();
    let pagination = first.pagination.unwrap();
    assert!(pagination.names_in_page.is_empty());
    assert_eq!(pagination.next_token.as_deref(), Some(SECOND_PAGE));
    assert_eq!(pagination.resume.unwrap().next_token, SECOND_PAGE);

    let second = client
        .audit_services(services_args(json!({
            "service_targets": target,
            "next_token": SECOND_PAGE
        })))
        .unwrap();
    assert_eq!(report(second.outcome).total_findings, 1);
}
