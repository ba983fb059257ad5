use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuditorError;

/// Audit strategies the findings API knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Auditor {
    Slo,
    OperationMetric,
    Trace,
    Log,
    DependencyMetric,
    TopContributor,
    ServiceQuota,
}

impl Auditor {
    pub const ALL: [Auditor; 7] = [
        Auditor::Slo,
        Auditor::OperationMetric,
        Auditor::Trace,
        Auditor::Log,
        Auditor::DependencyMetric,
        Auditor::TopContributor,
        Auditor::ServiceQuota,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Auditor::Slo => "slo",
            Auditor::OperationMetric => "operation_metric",
            Auditor::Trace => "trace",
            Auditor::Log => "log",
            Auditor::DependencyMetric => "dependency_metric",
            Auditor::TopContributor => "top_contributor",
            Auditor::ServiceQuota => "service_quota",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Sorted vocabulary, used in validation messages.
    pub fn allowed() -> Vec<&'static str> {
        let mut names: Vec<_> = Self::ALL.iter().map(Auditor::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Display for Auditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auditors to request. Empty means "let the backend run all of them".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditorSet(Vec<Auditor>);

impl AuditorSet {
    pub fn new(auditors: Vec<Auditor>) -> Self {
        Self(auditors)
    }

    pub fn all() -> Self {
        Self(Vec::new())
    }

    /// Parse a comma separated auditor list.
    ///
    /// `None` falls back to `defaults`, `"all"` yields the empty set, and
    /// every unknown name is reported at once.
    pub fn parse(raw: Option<&str>, defaults: &[Auditor]) -> Result<Self, AuditorError> {
        let Some(raw) = raw else {
            return Ok(Self(defaults.to_vec()));
        };
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }

        let mut auditors = Vec::new();
        let mut invalid = Vec::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match Auditor::from_name(item) {
                Some(auditor) if !auditors.contains(&auditor) => auditors.push(auditor),
                Some(_) => {}
                None => invalid.push(item.to_string()),
            }
        }

        if !invalid.is_empty() {
            return Err(AuditorError::Invalid {
                invalid,
                allowed: Auditor::allowed(),
            });
        }
        Ok(Self(auditors))
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Auditor] {
        &self.0
    }

    /// Names in request order; `None` for "all".
    pub fn names(&self) -> Option<Vec<&'static str>> {
        (!self.is_all()).then(|| self.0.iter().map(Auditor::as_str).collect())
    }
}
