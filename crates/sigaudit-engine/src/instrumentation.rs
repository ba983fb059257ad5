use sigaudit_types::ServiceSummary;

/// Keep services that can actually be audited.
///
/// A service survives if it is auditable (named, not `Unknown`, of type
/// `Service`) and none of its attribute maps marks it uninstrumented.
pub fn filter_instrumented(services: Vec<ServiceSummary>) -> Vec<ServiceSummary> {
    let total = services.len();
    let kept: Vec<ServiceSummary> = services
        .into_iter()
        .filter(|service| {
            if !service.is_auditable() {
                tracing::debug!(name = service.name(), "skipping non-auditable entity");
                return false;
            }
            if service.is_uninstrumented() {
                tracing::debug!(
                    name = service.name(),
                    instrumentation = service.instrumentation_type().unwrap_or_default(),
                    "skipping uninstrumented service"
                );
                return false;
            }
            tracing::debug!(name = service.name(), "keeping instrumented service");
            true
        })
        .collect();

    tracing::info!("{} instrumented out of {} total services", kept.len(), total);
    kept
}
