use anyhow::{Context, Result, bail};
use sigaudit_runtime::{Config, InMemoryBackend, SessionStore};
use sigaudit_sdk::Client;
use sigaudit_sdk::mcp::run_server;
use std::path::Path;
use std::sync::Arc;

pub async fn handle(config: &Config, fixture: Option<&Path>) -> Result<()> {
    let Some(path) = fixture.or(config.backend.fixture.as_deref()) else {
        bail!("No backend configured: pass --fixture or set [backend] fixture in the config file");
    };
    let backend = InMemoryBackend::load(path)
        .with_context(|| format!("Failed to load fixture {}", path.display()))?;

    tracing::info!(
        fixture = %path.display(),
        region = config.backend.region.as_deref().unwrap_or("default"),
        batch_size = config.audit.batch_size,
        "starting sigaudit MCP server"
    );

    let client = Client::new(
        Arc::new(backend),
        config.audit.clone(),
        SessionStore::new(config.sessions.clone()),
    );
    run_server(client).await
}
