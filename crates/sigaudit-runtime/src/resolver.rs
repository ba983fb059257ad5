//! Expansion of wildcard and inexact targets into concrete ones.
//!
//! Each entry point issues at most one page lookup and only expands against
//! that page. Callers continue with the returned token to see further pages.

use sigaudit_engine::{NameKind, NamePattern, best_matches, clean_page_token};
use sigaudit_types::{
    AuditTarget, ServiceOperationTarget, ServiceSummary, ServiceTarget, SloTarget, TargetKind,
    TimeRange,
};
use std::collections::HashMap;
use thiserror::Error;

use crate::backend::{
    AppSignalsApi, BackendError, ListOperationsRequest, ListServicesRequest, ListSlosRequest,
    MAX_OPERATIONS_PER_SERVICE,
};

/// Targets produced from one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expansion {
    /// Pass-through targets first, then expansions in pattern order.
    pub targets: Vec<AuditTarget>,
    pub next_token: Option<String>,
    /// Every entity name the page listed.
    pub names_in_page: Vec<String>,
    /// Wildcard and inexact names that drove the lookup.
    pub patterns: Vec<String>,
    /// Inexact names with no candidate in this page.
    pub unresolved: Vec<String>,
}

impl Expansion {
    fn passthrough(targets: Vec<AuditTarget>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub fn used_lookup(&self) -> bool {
        !self.patterns.is_empty()
    }

    fn push_unique(&mut self, target: AuditTarget) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to expand {} patterns [{}]: {source}", .kind.as_str(), .patterns.join(", "))]
pub struct ExpansionError {
    pub kind: TargetKind,
    pub patterns: Vec<String>,
    #[source]
    pub source: BackendError,
}

pub struct TargetResolver<'a> {
    api: &'a dyn AppSignalsApi,
}

impl<'a> TargetResolver<'a> {
    pub fn new(api: &'a dyn AppSignalsApi) -> Self {
        Self { api }
    }

    fn service_page(
        &self,
        kind: TargetKind,
        patterns: &[String],
        time_range: &TimeRange,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<(Vec<ServiceSummary>, Option<String>), ExpansionError> {
        let request = ListServicesRequest {
            time_range: *time_range,
            max_results,
            next_token: clean_page_token(next_token),
        };
        let page = self.api.list_services(&request).map_err(|source| {
            tracing::warn!(error = %source, "service lookup failed");
            ExpansionError {
                kind,
                patterns: patterns.to_vec(),
                source,
            }
        })?;
        let next_token = clean_page_token(page.next_token.as_deref());
        tracing::debug!(
            services = page.services.len(),
            has_more = next_token.is_some(),
            "retrieved service page"
        );
        Ok((page.services, next_token))
    }

    /// Expand service wildcards and resolve name-only services.
    pub fn expand_services(
        &self,
        targets: &[AuditTarget],
        time_range: &TimeRange,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<Expansion, ExpansionError> {
        let mut passthrough = Vec::new();
        let mut wildcards = Vec::new();
        let mut inexact = Vec::new();
        for target in targets {
            match target {
                AuditTarget::Service(service) if service.has_wildcard() => wildcards.push(service),
                AuditTarget::Service(service) if service.is_inexact() => inexact.push(service),
                other => passthrough.push(other.clone()),
            }
        }
        if wildcards.is_empty() && inexact.is_empty() {
            return Ok(Expansion::passthrough(passthrough));
        }

        let patterns: Vec<String> = wildcards
            .iter()
            .chain(&inexact)
            .map(|s| s.name.clone())
            .collect();
        tracing::info!(
            wildcards = wildcards.len(),
            inexact = inexact.len(),
            "expanding service targets"
        );

        let (services, next_token) = self.service_page(
            TargetKind::Service,
            &patterns,
            time_range,
            next_token,
            max_results,
        )?;
        let candidates: Vec<ServiceSummary> =
            services.iter().filter(|s| s.is_auditable()).cloned().collect();

        let mut expansion = Expansion {
            targets: passthrough,
            next_token,
            names_in_page: page_names(&services),
            patterns,
            unresolved: Vec::new(),
        };

        for pattern in wildcards {
            let matcher = NamePattern::parse(&pattern.name);
            let mut matched = 0;
            for candidate in candidates
                .iter()
                .filter(|c| matcher.matches(c.name()) && environment_matches(pattern, c))
            {
                expansion.push_unique(candidate.to_target().into());
                matched += 1;
            }
            tracing::debug!(pattern = %pattern.name, matched, "expanded service wildcard");
        }

        for target in inexact {
            let matches = best_matches(
                &target.name,
                &candidates,
                ServiceSummary::name,
                NameKind::Service,
            );
            if matches.is_empty() {
                tracing::debug!(name = %target.name, "no fuzzy match in this page");
                expansion.unresolved.push(target.name.clone());
                continue;
            }
            for found in matches {
                tracing::debug!(
                    name = %target.name,
                    matched = found.candidate.name(),
                    score = found.score,
                    "fuzzy matched service"
                );
                let mut resolved = found.candidate.to_target();
                if resolved.aws_account_id.is_none() {
                    resolved.aws_account_id = target.aws_account_id.clone();
                }
                expansion.push_unique(resolved.into());
            }
        }

        Ok(expansion)
    }

    /// Expand operation targets whose service or operation name has a wildcard.
    pub fn expand_service_operations(
        &self,
        targets: &[AuditTarget],
        time_range: &TimeRange,
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<Expansion, ExpansionError> {
        let mut passthrough = Vec::new();
        let mut wildcards = Vec::new();
        for target in targets {
            match target {
                AuditTarget::ServiceOperation(op) if op.has_wildcard() => wildcards.push(op),
                other => passthrough.push(other.clone()),
            }
        }
        if wildcards.is_empty() {
            return Ok(Expansion::passthrough(passthrough));
        }

        let patterns: Vec<String> = wildcards
            .iter()
            .map(|op| format!("{}::{}", op.service.name, op.operation))
            .collect();
        tracing::info!(patterns = wildcards.len(), "expanding service operation targets");

        let (services, next_token) = self.service_page(
            TargetKind::ServiceOperation,
            &patterns,
            time_range,
            next_token,
            max_results,
        )?;

        let mut expansion = Expansion {
            targets: passthrough,
            next_token,
            names_in_page: page_names(&services),
            patterns,
            unresolved: Vec::new(),
        };

        // One operations lookup per parent, shared across patterns.
        let mut operations_by_parent = HashMap::new();
        for pattern in wildcards {
            let service_matcher = NamePattern::parse(&pattern.service.name);
            let operation_matcher = NamePattern::parse(&pattern.operation);

            for parent in services.iter().filter(|s| {
                s.is_auditable()
                    && service_matcher.matches(s.name())
                    && environment_matches(&pattern.service, s)
            }) {
                let key = (parent.name().to_string(), parent.key_attributes.environment.clone());
                let operations = operations_by_parent.entry(key).or_insert_with(|| {
                    let request = ListOperationsRequest {
                        time_range: *time_range,
                        key_attributes: parent.key_attributes.clone(),
                        max_results: MAX_OPERATIONS_PER_SERVICE,
                    };
                    match self.api.list_service_operations(&request) {
                        Ok(operations) => operations,
                        Err(err) => {
                            tracing::warn!(
                                service = parent.name(),
                                error = %err,
                                "failed to list operations, skipping service"
                            );
                            Vec::new()
                        }
                    }
                });

                for operation in operations.iter().filter(|o| {
                    operation_matcher.matches(&o.name)
                        && o
                            .metric_references
                            .iter()
                            .any(|r| pattern.metric_type.is_satisfied_by(&r.metric_type))
                }) {
                    expansion.push_unique(
                        ServiceOperationTarget::new(
                            parent.to_target(),
                            operation.name.clone(),
                            pattern.metric_type,
                        )
                        .into(),
                    );
                }
            }
        }

        tracing::debug!(
            expanded = expansion.targets.len(),
            "expanded service operation targets"
        );
        Ok(expansion)
    }

    /// Expand SLO name wildcards.
    pub fn expand_slos(
        &self,
        targets: &[AuditTarget],
        next_token: Option<&str>,
        max_results: u32,
    ) -> Result<Expansion, ExpansionError> {
        let mut passthrough = Vec::new();
        let mut wildcards = Vec::new();
        for target in targets {
            match target {
                AuditTarget::Slo(slo) if slo.has_wildcard() => wildcards.push(slo),
                other => passthrough.push(other.clone()),
            }
        }
        if wildcards.is_empty() {
            return Ok(Expansion::passthrough(passthrough));
        }

        let patterns: Vec<String> = wildcards.iter().map(|s| s.slo_name.clone()).collect();
        tracing::info!(patterns = wildcards.len(), "expanding SLO targets");

        let request = ListSlosRequest {
            max_results,
            next_token: clean_page_token(next_token),
            include_linked_accounts: true,
        };
        let page = self
            .api
            .list_service_level_objectives(&request)
            .map_err(|source| {
                tracing::warn!(error = %source, "SLO lookup failed");
                ExpansionError {
                    kind: TargetKind::Slo,
                    patterns: patterns.clone(),
                    source,
                }
            })?;

        let mut expansion = Expansion {
            targets: passthrough,
            next_token: clean_page_token(page.next_token.as_deref()),
            names_in_page: page
                .slos
                .iter()
                .filter(|s| !s.name.is_empty())
                .map(|s| s.name.clone())
                .collect(),
            patterns,
            unresolved: Vec::new(),
        };

        for pattern in wildcards {
            let matcher = NamePattern::parse(&pattern.slo_name);
            for slo in page
                .slos
                .iter()
                .filter(|s| !s.name.is_empty() && matcher.matches(&s.name))
            {
                let mut target = SloTarget::new(slo.name.clone());
                target.slo_arn = slo.arn.clone();
                expansion.push_unique(target.into());
            }
        }

        Ok(expansion)
    }
}

fn page_names(services: &[ServiceSummary]) -> Vec<String> {
    services
        .iter()
        .map(ServiceSummary::name)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// A pattern pinned to an environment only matches entities in it.
fn environment_matches(pattern: &ServiceTarget, candidate: &ServiceSummary) -> bool {
    match pattern.environment.as_deref() {
        None | Some("") => true,
        Some(env) => candidate.key_attributes.environment.as_deref() == Some(env),
    }
}
