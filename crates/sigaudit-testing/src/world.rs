//! Isolated test environment.

use anyhow::Result;
use assert_cmd::Command;
use serde_json::Value;
use sigaudit_runtime::{AuditSettings, InMemoryBackend, SessionSettings, SessionStore};
use sigaudit_sdk::Client;
use sigaudit_sdk::mcp::serve_io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::rpc;

/// Client, backend and scratch directory for one test.
///
/// # Example
/// ```no_run
/// use sigaudit_testing::{TestWorld, fixtures};
///
/// let world = TestWorld::new(fixtures::payment_catalog());
/// world.backend().fail_next_audits(1);
/// let cleared = world.client().clear_sessions();
/// # let _ = cleared;
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    backend: Arc<InMemoryBackend>,
    client: Client,
}

impl TestWorld {
    pub fn new(backend: InMemoryBackend) -> Self {
        Self::with_settings(backend, AuditSettings::default(), SessionSettings::default())
    }

    pub fn with_settings(
        backend: InMemoryBackend,
        audit: AuditSettings,
        sessions: SessionSettings,
    ) -> Self {
        let backend = Arc::new(backend);
        let client = Client::new(backend.clone(), audit, SessionStore::new(sessions));
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            backend,
            client,
        }
    }

    pub fn backend(&self) -> &InMemoryBackend {
        &self.backend
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file under the temp directory and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Feed `requests` to an MCP server sharing this world's client.
    ///
    /// The server reaches EOF after the last request, which clears all sessions.
    pub async fn serve(&self, requests: &[Value]) -> Result<Vec<Value>> {
        let input = rpc::script(requests);
        let mut output = Vec::new();
        serve_io(self.client.clone(), input.as_bytes(), &mut output).await?;

        String::from_utf8(output)?
            .lines()
            .map(|line| serde_json::from_str(line).map_err(anyhow::Error::from))
            .collect()
    }

    /// `sigaudit` binary isolated from the user's config.
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sigaudit").expect("Failed to find sigaudit binary");
        cmd.current_dir(self.temp_dir.path())
            .env_remove("SIGAUDIT_CONFIG")
            .env("XDG_CONFIG_HOME", self.temp_dir.path())
            .env("HOME", self.temp_dir.path());
        cmd
    }
}
