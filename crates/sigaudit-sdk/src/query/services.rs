//! Instrumented service listing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sigaudit_types::ServiceSummary;

/// List services that emit Application Signals telemetry, one page at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListInstrumentedServicesArgs {
    /// Start of the lookup window (default: 24h before end_time)
    #[serde(default)]
    pub start_time: Option<String>,
    /// End of the lookup window (default: now)
    #[serde(default)]
    pub end_time: Option<String>,
    /// Services to look up in this page (default: 5, max: 100)
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Page token from a previous response's next_token. Omit for first page.
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentedService {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrumentation_type: Option<String>,
}

impl From<&ServiceSummary> for InstrumentedService {
    fn from(summary: &ServiceSummary) -> Self {
        Self {
            name: summary.name().to_string(),
            environment: summary.key_attributes.environment.clone(),
            aws_account_id: summary.key_attributes.aws_account_id.clone(),
            instrumentation_type: summary.instrumentation_type().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListInstrumentedServicesResponse {
    pub services: Vec<InstrumentedService>,
    pub total_in_page: usize,
    pub instrumented_in_page: usize,
    pub next_token: Option<String>,
}

impl ListInstrumentedServicesResponse {
    pub fn new(
        total_in_page: usize,
        services: Vec<InstrumentedService>,
        next_token: Option<String>,
    ) -> Self {
        let instrumented_in_page = services.len();
        Self {
            services,
            total_in_page,
            instrumented_in_page,
            next_token,
        }
    }
}
