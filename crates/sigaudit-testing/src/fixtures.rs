//! Sample Application Signals entities.

use serde_json::{Value, json};
use sigaudit_runtime::InMemoryBackend;
use sigaudit_types::{KeyAttributes, ServiceOperation, ServiceSummary, SloSummary};

pub const PROD: &str = "eks:prod";

pub fn service(name: &str, environment: &str) -> ServiceSummary {
    ServiceSummary::new(KeyAttributes::service(name, environment))
}

pub fn uninstrumented_service(name: &str, environment: &str) -> ServiceSummary {
    service(name, environment).with_attributes(json!({ "InstrumentationType": "UNINSTRUMENTED" }))
}

/// `count` services named `{prefix}-0`, `{prefix}-1`, ...
pub fn numbered_services(prefix: &str, count: usize) -> Vec<ServiceSummary> {
    (0..count)
        .map(|i| service(&format!("{prefix}-{i}"), PROD))
        .collect()
}

/// A small shop: three payment services among unrelated ones.
///
/// `payment-api` has operations; `legacy-ledger` is uninstrumented.
pub fn payment_catalog() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_services([
            service("payment-api", PROD),
            service("checkout", PROD),
            service("payment-worker", PROD),
            service("inventory", PROD),
            service("payment-gateway", "ec2:default"),
            uninstrumented_service("legacy-ledger", PROD),
        ])
        .with_operations(
            "payment-api",
            [
                ServiceOperation::new("GET /payments", &["Latency", "Fault"]),
                ServiceOperation::new("POST /payments", &["Latency", "Error"]),
                ServiceOperation::new("GET /health", &["Latency"]),
            ],
        )
        .with_slos([
            SloSummary::new("payment-latency"),
            SloSummary::new("checkout-availability"),
            SloSummary::new("payment-errors"),
        ])
        .with_synthetic_findings(1)
}

/// The same catalog in the on-disk fixture format read by `sigaudit serve --fixture`.
pub fn payment_fixture_json() -> Value {
    json!({
        "services": [
            {"KeyAttributes": {"Type": "Service", "Name": "payment-api", "Environment": PROD}},
            {"KeyAttributes": {"Type": "Service", "Name": "checkout", "Environment": PROD}},
            {"KeyAttributes": {"Type": "Service", "Name": "payment-worker", "Environment": PROD}},
            {
                "KeyAttributes": {"Type": "Service", "Name": "legacy-ledger", "Environment": PROD},
                "AttributeMaps": [{"InstrumentationType": "UNINSTRUMENTED"}]
            }
        ],
        "operations": {
            "payment-api": [
                {"Name": "GET /payments", "MetricReferences": [{"MetricType": "Latency"}]}
            ]
        },
        "slos": [{"Name": "payment-latency"}],
        "findings": {
            "payment-api": [{"Severity": "HIGH", "Summary": "p99 latency breach"}]
        }
    })
}
