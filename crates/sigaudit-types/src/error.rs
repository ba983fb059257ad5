use thiserror::Error;

/// A single audit target failed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target must be a JSON object, got: {0}")]
    NotAnObject(String),

    #[error("target is missing the 'Type' field: {0}")]
    MissingType(String),

    #[error("unknown target type '{0}' (expected service, service_operation or slo)")]
    UnknownType(String),

    #[error("{kind} target is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("invalid MetricType '{0}' (expected Latency, Availability, Fault or Error)")]
    InvalidMetricType(String),

    #[error(
        "Invalid SLO target format. Expected {{\"Type\":\"slo\",\"Data\":{{\"Slo\":{{\"SloName\":\"name\"}}}}}} but 'Slo' was {found}. The 'Slo' field must be an object with a 'SloName' key."
    )]
    MalformedSlo { found: String },
}

/// Position-aware wrapper used when a whole target list is validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("target #{index}: {source}")]
pub struct InvalidTarget {
    pub index: usize,
    #[source]
    pub source: TargetError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditorError {
    #[error("Invalid auditor(s): {}. Allowed: {}", .invalid.join(", "), .allowed.join(", "))]
    Invalid {
        invalid: Vec<String>,
        allowed: Vec<&'static str>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error(
        "invalid timestamp '{0}' (expected unix seconds, 'YYYY-MM-DD HH:MM:SS' or RFC 3339)"
    )]
    InvalidTimestamp(String),

    #[error("start time {start} must be before end time {end}")]
    Inverted { start: String, end: String },
}
