use anyhow::{Context, Result};
use sigaudit_runtime::Config;

use super::args::{Cli, Commands};
use super::handlers;
use crate::logging::init_tracing;

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_level)?;

    match cli.command {
        Commands::Serve { fixture } => {
            let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
            handlers::serve::handle(&config, fixture.as_deref()).await
        }
        Commands::Tools => handlers::tools::handle(),
    }
}
