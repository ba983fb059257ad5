use serde_json::json;
use sigaudit_engine::{
    Aggregated, BatchOutcome, NameKind, NamePattern, aggregate, clean_page_token,
    filter_instrumented, plan_batches, similarity,
};
use sigaudit_types::{AuditFinding, KeyAttributes, ServiceSummary};
use std::num::NonZeroUsize;

fn page() -> Vec<ServiceSummary> {
    let mut unknown = KeyAttributes::service("Unknown", "generic:default");
    unknown.entity_type = Some("RemoteService".to_string());
    vec![
        ServiceSummary::new(KeyAttributes::service("payment-a", "eks:prod")),
        ServiceSummary::new(KeyAttributes::service("order-b", "eks:prod")),
        ServiceSummary::new(unknown),
    ]
}

fn expand<'a>(pattern: &str, page: &'a [ServiceSummary]) -> Vec<&'a str> {
    let pattern = NamePattern::parse(pattern);
    page.iter()
        .filter(|s| s.is_auditable())
        .map(ServiceSummary::name)
        .filter(|name| pattern.matches(name))
        .collect()
}

#[test]
fn test_star_matches_every_valid_entity() {
    let page = page();
    assert_eq!(expand("*", &page), vec!["payment-a", "order-b"]);
}

#[test]
fn test_pay_wildcard_skips_sentinel_and_mismatches() {
    let page = page();
    assert_eq!(expand("*pay*", &page), vec!["payment-a"]);
    assert_eq!(expand("PAY*", &page), vec!["payment-a"]);
}

#[test]
fn test_instrumented_filter_and_wildcard_agree_on_candidates() {
    let kept = filter_instrumented(page());
    let names: Vec<&str> = kept.iter().map(ServiceSummary::name).collect();
    assert_eq!(names, expand("*", &page()));
}

#[test]
fn test_similarity_identity_is_maximal_for_all_kinds() {
    for kind in [NameKind::Service, NameKind::Operation, NameKind::Slo] {
        for name in ["a", "checkout", "Checkout-API", "slo latency p99"] {
            let max = similarity(name, name, kind);
            assert_eq!(max, 100);
            for other in ["b", "checkout-api", "latency"] {
                assert!(similarity(name, other, kind) <= max);
            }
        }
    }
}

#[test]
fn test_page_token_cleaning_branches() {
    let valid = "eyJhbGciOiJIUzI1NiJ9-_+/=".repeat(10);
    assert_eq!(clean_page_token(Some(&valid)), Some(valid.clone()));

    let salvage = format!("{}<<garbage>>", &valid[..240]);
    assert_eq!(clean_page_token(Some(&salvage)).as_deref(), Some(&valid[..240]));

    assert_eq!(clean_page_token(Some("{ not a token }")), None);
}

#[test]
fn test_seventeen_targets_aggregate_to_sum_of_chunks() {
    let targets: Vec<u32> = (0..17).collect();
    let chunks = plan_batches(&targets, NonZeroUsize::new(5).unwrap());

    let outcomes: Vec<BatchOutcome> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| BatchOutcome::Success {
            batch_index: i + 1,
            targets_count: chunk.len(),
            findings: chunk
                .iter()
                .map(|t| AuditFinding::new(json!({"target": t})))
                .collect(),
        })
        .collect();

    let Aggregated::Report(report) = aggregate(outcomes) else {
        panic!("expected report");
    };
    assert_eq!(report.total_batches, 4);
    assert_eq!(report.total_findings, 17);
    assert_eq!(report.total_targets_processed, 17);
    assert!(report.batch_errors.is_empty());
}
