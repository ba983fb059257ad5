use serde_json::{Value, json};
use sigaudit_runtime::InMemoryBackend;
use sigaudit_sdk::query::AuditServicesArgs;
use sigaudit_testing::rpc::{self, call_tool, is_tool_error, tool_payload};
use sigaudit_testing::{TestWorld, fixtures};

fn twelve_services() -> TestWorld {
    TestWorld::new(
        InMemoryBackend::new()
            .with_services(fixtures::numbered_services("svc", 12))
            .with_synthetic_findings(2),
    )
}

#[tokio::test]
async fn tools_list_exposes_every_tool() {
    let world = TestWorld::new(InMemoryBackend::new());
    let responses = world
        .serve(&[rpc::request(1, "initialize"), rpc::request(2, "tools/list")])
        .await
        .unwrap();

    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    insta::assert_json_snapshot!(names, @r#"
    [
      "audit_services",
      "audit_service_operations",
      "audit_slos",
      "continue_audit_batch",
      "get_audit_batch_status",
      "finalize_audit_session",
      "skip_audit_batch",
      "cancel_audit_session",
      "list_instrumented_services"
    ]
    "#);
    for tool in responses[1]["result"]["tools"].as_array().unwrap() {
        assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
    }
}

#[tokio::test]
async fn interactive_workflow_over_stdio_completes() {
    let world = twelve_services();
    // Start the session through the client: its id is needed in the script.
    let args: AuditServicesArgs = serde_json::from_value(json!({
        "service_targets": [{"Type": "service", "Service": "*"}],
        "max_services": 100
    }))
    .unwrap();
    let started = serde_json::to_value(world.client().audit_services(args).unwrap()).unwrap();
    assert_eq!(started["mode"], "interactive");
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let session = json!({ "session_id": session_id });
    let responses = world
        .serve(&[
            call_tool(1, "continue_audit_batch", session.clone()),
            call_tool(2, "continue_audit_batch", session.clone()),
            call_tool(3, "get_audit_batch_status", session.clone()),
            call_tool(4, "finalize_audit_session", session.clone()),
            call_tool(5, "continue_audit_batch", session.clone()),
        ])
        .await
        .unwrap();
    assert_eq!(responses.len(), 5);

    let last_batch = tool_payload(&responses[1]).unwrap();
    assert_eq!(last_batch["batch"]["batch_index"], 3);
    assert_eq!(last_batch["batch"]["session_status"], "completed");

    let status = tool_payload(&responses[2]).unwrap();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["remaining_batches"], 0);

    let finalized = tool_payload(&responses[3]).unwrap();
    assert_eq!(finalized["report"]["total_findings"], 24);
    assert_eq!(finalized["report"]["successful_batches"], 3);

    // Asking for more after the end is a structured result, not an error.
    assert!(!is_tool_error(&responses[4]));
    assert_eq!(tool_payload(&responses[4]).unwrap()["batch"]["status"], "completed");

    // EOF dropped the session.
    assert_eq!(world.client().sessions().active_count(), 0);
}

#[tokio::test]
async fn synchronous_audit_over_stdio() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let responses = world
        .serve(&[call_tool(
            1,
            "audit_services",
            json!({
                "service_targets": "[{\"Type\":\"service\",\"Service\":\"*payment*\"}]",
                "auditors": "all"
            }),
        )])
        .await
        .unwrap();

    let payload = tool_payload(&responses[0]).unwrap();
    assert_eq!(payload["mode"], "synchronous");
    assert_eq!(payload["report"]["total_findings"], 3);
    // "all" sends no auditor list.
    assert_eq!(payload["report"]["findings"][0]["Auditors"], Value::Null);
    assert_eq!(payload["pagination"]["resume"]["tool"], "audit_services");
}

#[tokio::test]
async fn validation_failures_are_tool_errors() {
    let world = TestWorld::new(fixtures::payment_catalog());
    let responses = world
        .serve(&[
            call_tool(
                1,
                "audit_services",
                json!({
                    "service_targets": [{"Type": "service", "Service": "*"}],
                    "auditors": "slo,bogus"
                }),
            ),
            call_tool(
                2,
                "audit_services",
                json!({
                    "service_targets": [{
                        "Type": "service",
                        "Data": {"Service": {"Name": "checkout", "Environment": "eks:prod"}}
                    }],
                    "next_token": "b2Zmc2V0OjU="
                }),
            ),
            call_tool(
                3,
                "audit_slos",
                json!({ "slo_targets": [{"Type": "slo", "Data": {"Slo": "checkout"}}] }),
            ),
        ])
        .await
        .unwrap();

    for response in &responses {
        assert!(is_tool_error(response), "{response}");
        assert_eq!(tool_payload(response).unwrap()["code"], "invalid_parameter");
    }
    let auditors = tool_payload(&responses[0]).unwrap();
    assert!(auditors["message"].as_str().unwrap().contains("bogus"));
    assert_eq!(tool_payload(&responses[1]).unwrap()["details"]["parameter"], "next_token");

    assert!(world.backend().calls().is_empty());
}

#[tokio::test]
async fn no_matches_lists_the_page() {
    let world = TestWorld::new(
        InMemoryBackend::new().with_services(fixtures::numbered_services("svc", 2)),
    );
    let responses = world
        .serve(&[call_tool(
            1,
            "audit_services",
            json!({ "service_targets": [{"Type": "service", "Service": "*billing*"}] }),
        )])
        .await
        .unwrap();

    assert!(is_tool_error(&responses[0]));
    let err = tool_payload(&responses[0]).unwrap();
    assert_eq!(err["code"], "no_matches");
    assert_eq!(err["details"]["names_in_page"], json!(["svc-0", "svc-1"]));
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let world = TestWorld::new(InMemoryBackend::new());
    let responses = world
        .serve(&[call_tool(1, "delete_everything", json!({}))])
        .await
        .unwrap();
    assert_eq!(responses[0]["error"]["code"], -32602);
}
