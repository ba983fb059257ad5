use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Result type for sigaudit-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture {}: {message}", .path.display())]
    Fixture { path: PathBuf, message: String },
}
