use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::target::ServiceTarget;

/// `KeyAttributes.Type` of an auditable service entity.
pub const SERVICE_ENTITY_TYPE: &str = "Service";

/// Placeholder name the backend reports for entities it could not identify.
pub const UNKNOWN_ENTITY_NAME: &str = "Unknown";

/// Attribute key carrying the instrumentation mode of a service.
pub const INSTRUMENTATION_TYPE_KEY: &str = "InstrumentationType";

/// Instrumentation types that mean the service emits no Application Signals data.
pub const UNINSTRUMENTED_TYPES: &[&str] = &["UNINSTRUMENTED", "AWS_NATIVE"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyAttributes {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyAttributes {
    pub fn service(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            entity_type: Some(SERVICE_ENTITY_TYPE.to_string()),
            name: Some(name.into()),
            environment: Some(environment.into()),
            aws_account_id: None,
            extra: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// One entry of a `list_services` page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSummary {
    pub key_attributes: KeyAttributes,
    /// Raw attribute maps; entries are not guaranteed to be objects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_maps: Vec<Value>,
}

impl ServiceSummary {
    pub fn new(key_attributes: KeyAttributes) -> Self {
        Self {
            key_attributes,
            attribute_maps: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attribute_maps.push(attributes);
        self
    }

    pub fn name(&self) -> &str {
        self.key_attributes.name()
    }

    /// Named, not the `Unknown` placeholder, and of type `Service`.
    pub fn is_auditable(&self) -> bool {
        let name = self.name();
        !name.is_empty()
            && name != UNKNOWN_ENTITY_NAME
            && self.key_attributes.entity_type.as_deref() == Some(SERVICE_ENTITY_TYPE)
    }

    /// True if any attribute map declares an uninstrumented type.
    pub fn is_uninstrumented(&self) -> bool {
        self.attribute_maps
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|map| map.get(INSTRUMENTATION_TYPE_KEY).and_then(Value::as_str))
            .any(|kind| UNINSTRUMENTED_TYPES.contains(&kind))
    }

    pub fn instrumentation_type(&self) -> Option<&str> {
        self.attribute_maps
            .iter()
            .filter_map(Value::as_object)
            .find_map(|map| map.get(INSTRUMENTATION_TYPE_KEY).and_then(Value::as_str))
    }

    pub fn to_target(&self) -> ServiceTarget {
        ServiceTarget {
            name: self.name().to_string(),
            environment: self.key_attributes.environment.clone(),
            aws_account_id: self.key_attributes.aws_account_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricReference {
    pub metric_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetricReference {
    pub fn new(metric_type: impl Into<String>) -> Self {
        Self {
            metric_type: metric_type.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceOperation {
    pub name: String,
    #[serde(default)]
    pub metric_references: Vec<MetricReference>,
}

impl ServiceOperation {
    pub fn new(name: impl Into<String>, metric_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            metric_references: metric_types.iter().map(|t| MetricReference::new(*t)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SloSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
}

impl SloSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: None,
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePage {
    #[serde(rename = "ServiceSummaries")]
    pub services: Vec<ServiceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SloPage {
    #[serde(rename = "SloSummaries")]
    pub slos: Vec<SloSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_backend_summary() {
        let summary: ServiceSummary = serde_json::from_value(json!({
            "KeyAttributes": {"Type": "Service", "Name": "checkout", "Environment": "eks:prod/default", "Identifier": "x"},
            "AttributeMaps": [{"PlatformType": "AWS::EKS"}, "garbage"]
        }))
        .unwrap();

        assert_eq!(summary.name(), "checkout");
        assert_eq!(summary.key_attributes.extra.get("Identifier"), Some(&json!("x")));
        assert!(summary.is_auditable());
        assert!(!summary.is_uninstrumented());
    }

    #[test]
    fn unknown_and_non_service_entities_are_not_auditable() {
        let unknown = ServiceSummary::new(KeyAttributes::service("Unknown", "generic:default"));
        assert!(!unknown.is_auditable());

        let mut remote = KeyAttributes::service("dynamodb", "aws");
        remote.entity_type = Some("RemoteService".to_string());
        assert!(!ServiceSummary::new(remote).is_auditable());

        assert!(!ServiceSummary::default().is_auditable());
    }

    #[test]
    fn uninstrumented_detected_in_any_map() {
        let summary = ServiceSummary::new(KeyAttributes::service("legacy", "ec2:default"))
            .with_attributes(json!({"PlatformType": "AWS::EC2"}))
            .with_attributes(json!({"InstrumentationType": "AWS_NATIVE"}));
        assert!(summary.is_uninstrumented());
        assert_eq!(summary.instrumentation_type(), Some("AWS_NATIVE"));
    }

    #[test]
    fn instrumentation_type_is_case_sensitive() {
        let summary = ServiceSummary::new(KeyAttributes::service("svc", "ec2:default"))
            .with_attributes(json!({"InstrumentationType": "uninstrumented"}));
        assert!(!summary.is_uninstrumented());
    }

    #[test]
    fn to_target_carries_environment_and_account() {
        let mut key = KeyAttributes::service("checkout", "eks:prod");
        key.aws_account_id = Some("123456789012".to_string());
        let target = ServiceSummary::new(key).to_target();
        assert_eq!(target.environment.as_deref(), Some("eks:prod"));
        assert_eq!(target.aws_account_id.as_deref(), Some("123456789012"));
    }
}
