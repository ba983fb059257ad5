//! Tool argument and response types.
//!
//! Argument structs double as the MCP input schemas, so their doc comments
//! are what callers read.

pub mod audit;
pub mod batch;
pub mod services;

pub use audit::{
    AuditMode, AuditOutcome, AuditResponse, AuditServiceOperationsArgs, AuditServicesArgs,
    AuditSlosArgs, ExpansionSummary, TargetsInput,
};
pub use batch::{
    CancelSessionResponse, ContinueBatchResponse, FinalizeResponse, SessionArgs, SkipBatchArgs,
    SkipBatchResponse,
};
pub use services::{
    InstrumentedService, ListInstrumentedServicesArgs, ListInstrumentedServicesResponse,
};
