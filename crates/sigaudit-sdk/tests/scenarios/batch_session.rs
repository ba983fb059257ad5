use serde_json::json;
use sigaudit_engine::Aggregated;
use sigaudit_runtime::{
    AuditSettings, BatchResult, InMemoryBackend, SessionId, SessionSettings, SessionStatus,
    SkipResult,
};
use sigaudit_sdk::Error;
use sigaudit_sdk::query::{AuditOutcome, AuditServicesArgs, AuditSlosArgs};
use sigaudit_testing::{TestWorld, fixtures};
use sigaudit_types::SloSummary;

/// 12 services: three batches of 5, 5 and 2.
fn twelve_services() -> TestWorld {
    TestWorld::new(
        InMemoryBackend::new()
            .with_services(fixtures::numbered_services("svc", 12))
            .with_synthetic_findings(1),
    )
}

fn start_session(world: &TestWorld) -> SessionId {
    let args: AuditServicesArgs = serde_json::from_value(json!({
        "service_targets": [{"Type": "service", "Service": "*"}],
        "max_services": 100
    }))
    .unwrap();
    match world.client().audit_services(args).unwrap().outcome {
        AuditOutcome::Interactive {
            session_id,
            first_batch,
            ..
        } => {
            assert!(matches!(first_batch, BatchResult::Success { batch_index: 1, .. }));
            session_id
        }
        other => panic!("expected an interactive session, got {other:?}"),
    }
}

#[test]
fn session_runs_to_completion_and_finalizes() {
    let world = twelve_services();
    let id = start_session(&world);

    let second = world.client().continue_audit_batch(id.as_str());
    assert!(matches!(
        second.batch,
        BatchResult::Success {
            batch_index: 2,
            session_status: SessionStatus::InProgress,
            ..
        }
    ));
    let third = world.client().continue_audit_batch(id.as_str());
    assert!(matches!(
        third.batch,
        BatchResult::Success {
            batch_index: 3,
            targets_in_batch: 2,
            session_status: SessionStatus::Completed,
            ..
        }
    ));
    assert!(matches!(
        world.client().continue_audit_batch(id.as_str()).batch,
        BatchResult::Exhausted { .. }
    ));

    let finalized = world.client().finalize_audit_session(id.as_str()).unwrap();
    assert_eq!(finalized.status, SessionStatus::Completed);
    let Aggregated::Report(report) = finalized.report else {
        panic!("expected a report");
    };
    assert_eq!(report.total_findings, 12);
    assert_eq!(report.successful_batches, 3);
    assert_eq!(report.total_targets_processed, 12);

    // Finalizing keeps the session around.
    assert!(world.client().get_batch_status(id.as_str()).is_ok());
}

#[test]
fn failed_batch_is_retried_in_place() {
    let world = twelve_services();
    let id = start_session(&world);

    world.backend().fail_next_audits(1);
    let failed = world.client().continue_audit_batch(id.as_str());
    assert!(matches!(
        failed.batch,
        BatchResult::Failed {
            batch_index: 2,
            retryable: true,
            ..
        }
    ));
    assert_eq!(failed.progress.unwrap().next_batch, Some(2));

    let retried = world.client().continue_audit_batch(id.as_str());
    assert!(matches!(retried.batch, BatchResult::Success { batch_index: 2, .. }));
}

#[test]
fn skipped_batches_surface_as_batch_errors() {
    let world = twelve_services();
    let id = start_session(&world);

    let skipped = world
        .client()
        .skip_audit_batch(id.as_str(), Some("throttled repeatedly"));
    assert!(matches!(skipped.result, SkipResult::Skipped { batch_index: 2, .. }));
    world.client().continue_audit_batch(id.as_str());

    let finalized = world.client().finalize_audit_session(id.as_str()).unwrap();
    let Aggregated::Report(report) = finalized.report else {
        panic!("expected a report");
    };
    assert_eq!(report.total_batches, 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.batch_errors[0].batch_index, 2);
    assert_eq!(report.batch_errors[0].error, "throttled repeatedly");
    assert_eq!(report.total_findings, 7);
}

#[test]
fn cancelled_session_is_gone() {
    let world = twelve_services();
    let id = start_session(&world);

    let cancelled = world.client().cancel_audit_session(id.as_str()).unwrap();
    assert!(cancelled.cancelled);
    assert_eq!(cancelled.processed_batches, 1);
    assert_eq!(cancelled.remaining_batches, 2);

    assert!(matches!(
        world.client().get_batch_status(id.as_str()),
        Err(Error::SessionNotFound(_))
    ));
    assert!(matches!(
        world.client().skip_audit_batch(id.as_str(), None).result,
        SkipResult::NotFound { .. }
    ));
}

#[test]
fn forced_interactive_mode_on_a_small_set() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let args: AuditServicesArgs = serde_json::from_value(json!({
        "service_targets": [{"Type": "service", "Service": "*payment*"}],
        "mode": "interactive"
    }))
    .unwrap();

    let AuditOutcome::Interactive {
        progress,
        next_step,
        ..
    } = world.client().audit_services(args).unwrap().outcome
    else {
        panic!("expected an interactive session");
    };
    assert_eq!(progress.unwrap().status, SessionStatus::Completed);
    assert!(next_step.contains("finalize_audit_session"));
}

#[test]
fn service_and_slo_sessions_run_side_by_side() {
    let world = TestWorld::new(
        InMemoryBackend::new()
            .with_services(fixtures::numbered_services("svc", 12))
            .with_slos((0..7).map(|i| SloSummary::new(format!("slo-{i}"))))
            .with_synthetic_findings(1),
    );
    let services = start_session(&world);

    let args: AuditSlosArgs = serde_json::from_value(json!({
        "slo_targets": [{"Type": "slo", "Data": {"Slo": {"SloName": "*"}}}],
        "max_slos": 100
    }))
    .unwrap();
    let AuditOutcome::Interactive { session_id: slos, .. } =
        world.client().audit_slos(args).unwrap().outcome
    else {
        panic!("expected an interactive SLO session");
    };

    let next = world.client().continue_audit_batch(services.as_str());
    assert!(matches!(next.batch, BatchResult::Success { batch_index: 2, .. }));
    let next = world.client().continue_audit_batch(slos.as_str());
    assert!(matches!(
        next.batch,
        BatchResult::Success {
            batch_index: 2,
            session_status: SessionStatus::Completed,
            ..
        }
    ));
}

#[test]
fn new_session_evicts_the_previous_one_at_capacity() {
    let world = TestWorld::with_settings(
        InMemoryBackend::new()
            .with_services(fixtures::numbered_services("svc", 12))
            .with_synthetic_findings(1),
        AuditSettings::default(),
        SessionSettings {
            max_sessions: 1,
            ..SessionSettings::default()
        },
    );
    let first = start_session(&world);
    let second = start_session(&world);

    assert_ne!(first, second);
    assert!(world.client().get_batch_status(first.as_str()).is_err());
    assert!(world.client().get_batch_status(second.as_str()).is_ok());
}
