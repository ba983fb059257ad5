use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::session::SessionSettings;

pub const CONFIG_ENV_VAR: &str = "SIGAUDIT_CONFIG";
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_MAX_RESULTS: u32 = 5;

const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Resolve the config file location based on priority:
/// 1. Explicit path
/// 2. SIGAUDIT_CONFIG environment variable
/// 3. XDG config directory (`<config>/sigaudit/config.toml`)
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }
    if let Some(env_path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|dir| dir.join("sigaudit").join("config.toml"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Targets per findings call.
    pub batch_size: usize,
    /// Largest target count still run synchronously. Defaults to `batch_size`.
    pub interactive_threshold: Option<usize>,
    /// Page size for service and SLO lookups when the caller gives none.
    pub default_max_results: u32,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            interactive_threshold: None,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl AuditSettings {
    pub fn chunk_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_size).unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    pub fn threshold(&self) -> usize {
        self.interactive_threshold.unwrap_or(self.batch_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Serve lookups and findings from this fixture file instead of AWS.
    pub fixture: Option<PathBuf>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audit: AuditSettings,
    pub sessions: SessionSettings,
    pub backend: BackendSettings,
}

impl Config {
    /// Load from the resolved location, falling back to defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_config_path(explicit_path) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audit.batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.audit.default_max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audit.default_max_results",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.max_sessions",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sessions.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
