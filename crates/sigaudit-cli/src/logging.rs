use tracing_subscriber::EnvFilter;

use crate::LogLevel;

pub const LOG_ENV_VAR: &str = "SIGAUDIT_LOG";

/// Install the global subscriber. stdout carries the protocol, so logs go to stderr.
pub fn init_tracing(level: LogLevel) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
