pub mod auditor;
pub mod entity;
pub mod error;
pub mod finding;
pub mod target;
pub mod time;

pub use auditor::{Auditor, AuditorSet};
pub use entity::*;
pub use error::{AuditorError, InvalidTarget, TargetError, TimeRangeError};
pub use finding::AuditFinding;
pub use target::*;
pub use time::TimeRange;
