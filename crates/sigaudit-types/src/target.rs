//! Audit target model.
//!
//! Targets travel in the Application Signals wire shape:
//!
//! ```json
//! {"Type":"service","Data":{"Service":{"Type":"Service","Name":"checkout","Environment":"eks:prod"}}}
//! {"Type":"service_operation","Data":{"ServiceOperation":{"Service":{..},"Operation":"GET /","MetricType":"Latency"}}}
//! {"Type":"slo","Data":{"Slo":{"SloName":"checkout-availability"}}}
//! ```
//!
//! Callers hand us arbitrary JSON, so [`AuditTarget::parse`] is the single
//! validation point. Serialization and deserialization both go through the
//! same shape.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{InvalidTarget, TargetError};

/// Wildcard marker accepted in target names.
pub const WILDCARD: char = '*';

/// Metric family required on an operation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MetricType {
    #[default]
    Latency,
    Availability,
    Fault,
    Error,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Latency => "Latency",
            MetricType::Availability => "Availability",
            MetricType::Fault => "Fault",
            MetricType::Error => "Error",
        }
    }

    /// Case-insensitive lookup of a metric type name.
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "latency" => Some(MetricType::Latency),
            "availability" => Some(MetricType::Availability),
            "fault" => Some(MetricType::Fault),
            "error" => Some(MetricType::Error),
            _ => None,
        }
    }

    /// Whether an operation's metric reference of type `reference` provides
    /// this metric. Availability is computed from the Fault metric, so a
    /// Fault reference also satisfies an Availability request.
    pub fn is_satisfied_by(&self, reference: &str) -> bool {
        reference == self.as_str()
            || (*self == MetricType::Availability && reference == MetricType::Fault.as_str())
    }
}

/// Discriminant of [`AuditTarget`], also the lowercase wire `Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Service,
    ServiceOperation,
    Slo,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Service => "service",
            TargetKind::ServiceOperation => "service_operation",
            TargetKind::Slo => "slo",
        }
    }
}

/// A named service, optionally pinned to an environment and account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub name: String,
    pub environment: Option<String>,
    pub aws_account_id: Option<String>,
}

impl ServiceTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: None,
            aws_account_id: None,
        }
    }

    pub fn in_environment(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: Some(environment.into()),
            aws_account_id: None,
        }
    }

    pub fn with_account(mut self, aws_account_id: impl Into<String>) -> Self {
        self.aws_account_id = Some(aws_account_id.into());
        self
    }

    pub fn has_wildcard(&self) -> bool {
        self.name.contains(WILDCARD)
    }

    /// A name-only reference: no wildcard, but no environment either, so the
    /// real entity still has to be looked up.
    pub fn is_inexact(&self) -> bool {
        !self.has_wildcard() && self.environment.as_deref().is_none_or(str::is_empty)
    }

    fn to_value(&self) -> Value {
        let mut service = Map::new();
        service.insert("Type".into(), Value::from("Service"));
        service.insert("Name".into(), Value::from(self.name.as_str()));
        if let Some(environment) = &self.environment {
            service.insert("Environment".into(), Value::from(environment.as_str()));
        }
        if let Some(account) = &self.aws_account_id {
            service.insert("AwsAccountId".into(), Value::from(account.as_str()));
        }
        Value::Object(service)
    }

    fn from_object(service: &Map<String, Value>, kind: &'static str) -> Result<Self, TargetError> {
        let name = non_empty_str(service, "Name").ok_or(TargetError::MissingField {
            kind,
            field: "Service.Name",
        })?;
        Ok(Self {
            name: name.to_string(),
            environment: non_empty_str(service, "Environment").map(str::to_string),
            aws_account_id: non_empty_str(service, "AwsAccountId").map(str::to_string),
        })
    }
}

/// An operation of a service, audited on one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOperationTarget {
    pub service: ServiceTarget,
    pub operation: String,
    pub metric_type: MetricType,
}

impl ServiceOperationTarget {
    pub fn new(
        service: ServiceTarget,
        operation: impl Into<String>,
        metric_type: MetricType,
    ) -> Self {
        Self {
            service,
            operation: operation.into(),
            metric_type,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.service.has_wildcard() || self.operation.contains(WILDCARD)
    }
}

/// A service level objective, by name (and ARN once resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SloTarget {
    pub slo_name: String,
    pub slo_arn: Option<String>,
}

impl SloTarget {
    pub fn new(slo_name: impl Into<String>) -> Self {
        Self {
            slo_name: slo_name.into(),
            slo_arn: None,
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.slo_arn = Some(arn.into());
        self
    }

    pub fn has_wildcard(&self) -> bool {
        self.slo_name.contains(WILDCARD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditTarget {
    Service(ServiceTarget),
    ServiceOperation(ServiceOperationTarget),
    Slo(SloTarget),
}

impl AuditTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            AuditTarget::Service(_) => TargetKind::Service,
            AuditTarget::ServiceOperation(_) => TargetKind::ServiceOperation,
            AuditTarget::Slo(_) => TargetKind::Slo,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        match self {
            AuditTarget::Service(service) => service.has_wildcard(),
            AuditTarget::ServiceOperation(operation) => operation.has_wildcard(),
            AuditTarget::Slo(slo) => slo.has_wildcard(),
        }
    }

    /// Short label for logs and progress output.
    pub fn label(&self) -> String {
        match self {
            AuditTarget::Service(service) => service.name.clone(),
            AuditTarget::ServiceOperation(op) => format!("{}::{}", op.service.name, op.operation),
            AuditTarget::Slo(slo) => slo.slo_name.clone(),
        }
    }

    /// Validate one caller-supplied target.
    pub fn parse(value: &Value) -> Result<Self, TargetError> {
        let object = value
            .as_object()
            .ok_or_else(|| TargetError::NotAnObject(value.to_string()))?;
        let kind = object
            .get("Type")
            .and_then(Value::as_str)
            .ok_or_else(|| TargetError::MissingType(value.to_string()))?;

        match kind.to_ascii_lowercase().as_str() {
            "service" => parse_service(object).map(AuditTarget::Service),
            "service_operation" => {
                parse_service_operation(object).map(AuditTarget::ServiceOperation)
            }
            "slo" => parse_slo(object).map(AuditTarget::Slo),
            _ => Err(TargetError::UnknownType(kind.to_string())),
        }
    }

    /// Validate a target list, reporting the first offending position.
    pub fn parse_all(values: &[Value]) -> Result<Vec<Self>, InvalidTarget> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                Self::parse(value).map_err(|source| InvalidTarget { index, source })
            })
            .collect()
    }

    pub fn to_value(&self) -> Value {
        let (kind, key, data) = match self {
            AuditTarget::Service(service) => (TargetKind::Service, "Service", service.to_value()),
            AuditTarget::ServiceOperation(op) => {
                let mut inner = Map::new();
                inner.insert("Service".into(), op.service.to_value());
                inner.insert("Operation".into(), Value::from(op.operation.as_str()));
                inner.insert("MetricType".into(), Value::from(op.metric_type.as_str()));
                (TargetKind::ServiceOperation, "ServiceOperation", Value::Object(inner))
            }
            AuditTarget::Slo(slo) => {
                let mut inner = Map::new();
                inner.insert("SloName".into(), Value::from(slo.slo_name.as_str()));
                if let Some(arn) = &slo.slo_arn {
                    inner.insert("SloArn".into(), Value::from(arn.as_str()));
                }
                (TargetKind::Slo, "Slo", Value::Object(inner))
            }
        };

        let mut wrapper = Map::new();
        wrapper.insert(key.into(), data);
        let mut target = Map::new();
        target.insert("Type".into(), Value::from(kind.as_str()));
        target.insert("Data".into(), Value::Object(wrapper));
        Value::Object(target)
    }
}

impl From<ServiceTarget> for AuditTarget {
    fn from(target: ServiceTarget) -> Self {
        AuditTarget::Service(target)
    }
}

impl From<ServiceOperationTarget> for AuditTarget {
    fn from(target: ServiceOperationTarget) -> Self {
        AuditTarget::ServiceOperation(target)
    }
}

impl From<SloTarget> for AuditTarget {
    fn from(target: SloTarget) -> Self {
        AuditTarget::Slo(target)
    }
}

impl Serialize for AuditTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AuditTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        AuditTarget::parse(&value).map_err(D::Error::custom)
    }
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn data_object<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object
        .get("Data")
        .and_then(Value::as_object)
        .and_then(|data| data.get(key))
}

fn parse_service(object: &Map<String, Value>) -> Result<ServiceTarget, TargetError> {
    if let Some(service) = data_object(object, "Service").and_then(Value::as_object) {
        return ServiceTarget::from_object(service, "service");
    }

    // Shorthand: {"Type":"service","Service":"checkout"}
    match non_empty_str(object, "Service") {
        Some(name) => Ok(ServiceTarget::new(name)),
        None => Err(TargetError::MissingField {
            kind: "service",
            field: "Data.Service.Name",
        }),
    }
}

fn parse_service_operation(
    object: &Map<String, Value>,
) -> Result<ServiceOperationTarget, TargetError> {
    const KIND: &str = "service_operation";

    let inner = data_object(object, "ServiceOperation")
        .and_then(Value::as_object)
        .ok_or(TargetError::MissingField {
            kind: KIND,
            field: "Data.ServiceOperation",
        })?;
    let service = inner
        .get("Service")
        .and_then(Value::as_object)
        .ok_or(TargetError::MissingField {
            kind: KIND,
            field: "ServiceOperation.Service",
        })?;
    let operation = non_empty_str(inner, "Operation").ok_or(TargetError::MissingField {
        kind: KIND,
        field: "ServiceOperation.Operation",
    })?;
    let metric_type = match inner.get("MetricType").and_then(Value::as_str) {
        None => MetricType::default(),
        Some(raw) => MetricType::from_name(raw)
            .ok_or_else(|| TargetError::InvalidMetricType(raw.to_string()))?,
    };

    Ok(ServiceOperationTarget {
        service: ServiceTarget::from_object(service, KIND)?,
        operation: operation.to_string(),
        metric_type,
    })
}

fn parse_slo(object: &Map<String, Value>) -> Result<SloTarget, TargetError> {
    let slo = match data_object(object, "Slo") {
        Some(Value::Object(slo)) => slo,
        Some(Value::String(raw)) => {
            return Err(TargetError::MalformedSlo {
                found: format!("a string \"{raw}\""),
            });
        }
        Some(other) => {
            return Err(TargetError::MalformedSlo {
                found: format!("{} {other}", json_type_name(other)),
            });
        }
        None => {
            return Err(TargetError::MalformedSlo {
                found: "missing".to_string(),
            });
        }
    };

    let name = non_empty_str(slo, "SloName").ok_or(TargetError::MissingField {
        kind: "slo",
        field: "Slo.SloName",
    })?;
    Ok(SloTarget {
        slo_name: name.to_string(),
        slo_arn: non_empty_str(slo, "SloArn").map(str::to_string),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
