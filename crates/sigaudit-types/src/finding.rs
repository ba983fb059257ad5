use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record returned by the findings API. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditFinding(pub Value);

impl AuditFinding {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for AuditFinding {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
