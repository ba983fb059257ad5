//! Audit tool query types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigaudit_engine::{Aggregated, ExecutionMode, PaginationInfo};
use sigaudit_runtime::{BatchResult, SessionId, SessionProgress};

use crate::{Error, Result};

/// Targets as a JSON array, or a string holding one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TargetsInput {
    List(Vec<Value>),
    Json(String),
}

impl TargetsInput {
    pub fn into_values(self, parameter: &'static str) -> Result<Vec<Value>> {
        let values = match self {
            TargetsInput::List(values) => values,
            TargetsInput::Json(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(values)) => values,
                Ok(object @ Value::Object(_)) => vec![object],
                Ok(_) => {
                    return Err(Error::validation(parameter, "must be a JSON array of targets"));
                }
                Err(e) => return Err(Error::validation(parameter, format!("invalid JSON: {}", e))),
            },
        };
        if values.is_empty() {
            return Err(Error::validation(parameter, "must contain at least one target"));
        }
        Ok(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Audit every target in this call
    Synchronous,
    /// Start a batch session and audit the first batch
    Interactive,
}

impl From<AuditMode> for ExecutionMode {
    fn from(mode: AuditMode) -> Self {
        match mode {
            AuditMode::Synchronous => ExecutionMode::Synchronous,
            AuditMode::Interactive => ExecutionMode::Interactive,
        }
    }
}

/// Audit services for SLO breaches, metric anomalies and other findings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditServicesArgs {
    /// Service targets, e.g. [{"Type":"service","Data":{"Service":{"Type":"Service","Name":"checkout","Environment":"eks:prod"}}}].
    /// Names may contain '*' wildcards; a name without Environment is matched approximately.
    pub service_targets: TargetsInput,
    /// Start of the audit window: unix seconds, 'YYYY-MM-DD HH:MM:SS' or RFC 3339 (default: 24h before end_time)
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the audit window (default: now)
    #[serde(default)]
    pub end_time: Option<String>,
    /// Comma separated auditors, or 'all' (default: slo,operation_metric)
    #[serde(default)]
    pub auditors: Option<String>,
    /// Page token from a previous response's pagination.next_token. Only valid with wildcard or name-only targets.
    #[serde(default)]
    pub next_token: Option<String>,
    /// Services to look up per page when expanding wildcards (default: 5, max: 100)
    #[serde(default)]
    pub max_services: Option<u32>,
    /// Force synchronous or interactive execution (default: by target count)
    #[serde(default)]
    pub mode: Option<AuditMode>,
}

/// Audit individual service operations on one metric family.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditServiceOperationsArgs {
    /// Operation targets, e.g. [{"Type":"service_operation","Data":{"ServiceOperation":{"Service":{"Type":"Service","Name":"*payment*"},"Operation":"*GET*","MetricType":"Latency"}}}].
    /// MetricType is Latency, Availability, Fault or Error; Availability also matches Fault metrics.
    pub operation_targets: TargetsInput,
    /// Start of the audit window (default: 24h before end_time)
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the audit window (default: now)
    #[serde(default)]
    pub end_time: Option<String>,
    /// Comma separated auditors, or 'all' (default: operation_metric)
    #[serde(default)]
    pub auditors: Option<String>,
    /// Page token from a previous response's pagination.next_token. Only valid with wildcard targets.
    #[serde(default)]
    pub next_token: Option<String>,
    /// Parent services to look up per page (default: 5, max: 100)
    #[serde(default)]
    pub max_services: Option<u32>,
    /// Force synchronous or interactive execution (default: by target count)
    #[serde(default)]
    pub mode: Option<AuditMode>,
}

/// Audit service level objectives.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditSlosArgs {
    /// SLO targets, e.g. [{"Type":"slo","Data":{"Slo":{"SloName":"checkout-latency"}}}]. 'Slo' must be an object.
    pub slo_targets: TargetsInput,
    /// Start of the audit window (default: 24h before end_time)
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the audit window (default: now)
    #[serde(default)]
    pub end_time: Option<String>,
    /// Comma separated auditors, or 'all' (default: slo)
    #[serde(default)]
    pub auditors: Option<String>,
    /// Page token from a previous response's pagination.next_token. Only valid with wildcard targets.
    #[serde(default)]
    pub next_token: Option<String>,
    /// SLOs to look up per page when expanding wildcards (default: 5, max: 100)
    #[serde(default)]
    pub max_slos: Option<u32>,
    /// Force synchronous or interactive execution (default: by target count)
    #[serde(default)]
    pub mode: Option<AuditMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpansionSummary {
    pub requested_targets: usize,
    pub expanded_targets: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuditOutcome {
    Synchronous {
        report: Aggregated,
    },
    Interactive {
        session_id: SessionId,
        first_batch: BatchResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<SessionProgress>,
        next_step: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResponse {
    #[serde(flatten)]
    pub outcome: AuditOutcome,
    pub expansion: ExpansionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn targets_accept_array_or_json_string() {
        let list: TargetsInput =
            serde_json::from_value(json!([{"Type": "service", "Service": "a"}])).unwrap();
        assert_eq!(list.into_values("service_targets").unwrap().len(), 1);

        let raw = r#"[{"Type":"slo","Data":{"Slo":{"SloName":"x"}}}]"#;
        let text: TargetsInput = serde_json::from_value(json!(raw)).unwrap();
        assert_eq!(text.into_values("slo_targets").unwrap().len(), 1);
    }

    #[test]
    fn targets_reject_empty_and_garbage() {
        let empty = TargetsInput::List(vec![]);
        assert!(matches!(
            empty.into_values("service_targets"),
            Err(Error::Validation { parameter: "service_targets", .. })
        ));
        assert!(TargetsInput::Json("not json".into()).into_values("x").is_err());
        assert!(TargetsInput::Json("42".into()).into_values("x").is_err());
    }
}
