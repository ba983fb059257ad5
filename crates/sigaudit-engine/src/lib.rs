//! Pure logic behind target expansion and batch execution.
//!
//! Nothing here performs I/O; the runtime crate feeds backend pages in and
//! acts on the results.

pub mod aggregate;
pub mod instrumentation;
pub mod matcher;
pub mod pagination;
pub mod pattern;
pub mod planner;

pub use aggregate::{Aggregated, AuditReport, BatchError, BatchOutcome, aggregate};
pub use instrumentation::filter_instrumented;
pub use matcher::{
    FuzzyMatch, HIGH_CONFIDENCE_SCORE, MAX_FUZZY_CANDIDATES, MIN_MATCH_SCORE, NameKind,
    best_matches, similarity,
};
pub use pagination::{PageRequest, PaginationInfo, ResumeParams, clean_page_token};
pub use pattern::NamePattern;
pub use planner::{BatchPlan, ExecutionMode, choose_mode, plan_batches};
