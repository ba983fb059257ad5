pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod resolver;
pub mod session;

pub use backend::{
    AppSignalsApi, AuditRequest, BackendError, ListOperationsRequest, ListServicesRequest,
    ListSlosRequest,
};
pub use config::{AuditSettings, BackendSettings, Config, ConfigError, resolve_config_path};
pub use error::{Error, Result};
pub use executor::{BatchResult, SkipResult, execute_next, run_all, skip_current};
pub use memory::{Fixture, InMemoryBackend, RecordedCall};
pub use resolver::{Expansion, ExpansionError, TargetResolver};
pub use session::{
    AuditParams, BatchFailure, BatchSession, BatchSuccess, SessionId, SessionProgress,
    SessionSettings, SessionStatus, SessionStore,
};
