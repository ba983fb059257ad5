//! Interactive batch sessions.
//!
//! A [`SessionStore`] owns every [`BatchSession`] for its lifetime. Readers
//! get snapshots; mutation goes through [`SessionStore::update`] so the lock
//! is never held across a backend call.
//!
//! Two `execute_next` calls racing on the same session id both see the same
//! cursor. Callers run one workflow per session id at a time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sigaudit_engine::BatchPlan;
use sigaudit_types::{AuditFinding, AuditTarget, AuditorSet, TimeRange};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_MAX_SESSIONS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle time after which a session is dropped.
    pub timeout_secs: u64,
    /// Sessions kept at once; the oldest are evicted first.
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(format!("batch-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    InProgress,
    Completed,
}

/// Request parameters every batch of a session is run with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditParams {
    pub time_range: TimeRange,
    pub auditors: AuditorSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSuccess {
    pub batch_index: usize,
    pub targets_count: usize,
    pub findings_count: usize,
}

/// A batch the caller gave up on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub targets_count: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub total_targets: usize,
    pub total_batches: usize,
    pub processed_batches: usize,
    pub skipped_batches: usize,
    pub remaining_batches: usize,
    /// 1-based index of the next batch, if any remain.
    pub next_batch: Option<usize>,
    pub total_findings: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub targets: Vec<AuditTarget>,
    pub params: AuditParams,
    pub plan: BatchPlan<AuditTarget>,
    pub processed: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
    pub findings: Vec<AuditFinding>,
    pub status: SessionStatus,
}

impl BatchSession {
    /// Status implied by the cursor once at least one batch was handled.
    pub fn refresh_status(&mut self) {
        self.status = if self.plan.is_exhausted() {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        };
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            session_id: self.id.clone(),
            status: self.status,
            total_targets: self.targets.len(),
            total_batches: self.plan.total(),
            processed_batches: self.processed.len(),
            skipped_batches: self.failed.len(),
            remaining_batches: self.plan.remaining(),
            next_batch: (!self.plan.is_exhausted()).then(|| self.plan.position() + 1),
            total_findings: self.findings.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct SessionStore {
    settings: SessionSettings,
    clock: Clock,
    sessions: Mutex<HashMap<SessionId, BatchSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_clock(settings, Utc::now)
    }

    pub fn with_clock(
        settings: SessionSettings,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            settings,
            clock: Arc::new(clock),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, BatchSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timeout(&self) -> Duration {
        Duration::seconds(i64::try_from(self.settings.timeout_secs).unwrap_or(i64::MAX))
    }

    fn is_stale(&self, session: &BatchSession, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - session.last_activity > timeout
    }

    pub fn create(
        &self,
        targets: Vec<AuditTarget>,
        params: AuditParams,
        chunk_size: NonZeroUsize,
    ) -> SessionId {
        let now = self.now();
        let id = SessionId::generate();
        let session = BatchSession {
            id: id.clone(),
            created_at: now,
            last_activity: now,
            plan: BatchPlan::new(&targets, chunk_size),
            targets,
            params,
            processed: Vec::new(),
            failed: Vec::new(),
            findings: Vec::new(),
            status: SessionStatus::Created,
        };
        tracing::info!(
            session_id = %id,
            targets = session.targets.len(),
            batches = session.plan.total(),
            "created batch session"
        );

        let mut sessions = self.lock();
        sessions.insert(id.clone(), session);
        // The session being created is never its own eviction candidate.
        while sessions.len() > self.settings.max_sessions {
            let Some(oldest) = sessions
                .values()
                .filter(|s| s.id != id)
                .min_by_key(|s| s.created_at)
                .map(|s| s.id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session_id = %oldest, "evicted batch session over capacity");
        }
        id
    }

    /// Snapshot of a live session. Expired sessions read as absent.
    pub fn get(&self, id: &SessionId) -> Option<BatchSession> {
        let now = self.now();
        let timeout = self.timeout();
        let mut sessions = self.lock();
        if sessions
            .get(id)
            .is_some_and(|s| self.is_stale(s, now, timeout))
        {
            sessions.remove(id);
            tracing::info!(session_id = %id, "batch session expired");
            return None;
        }
        sessions.get(id).cloned()
    }

    pub fn touch(&self, id: &SessionId) {
        let now = self.now();
        if let Some(session) = self.lock().get_mut(id) {
            session.last_activity = now;
        }
    }

    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut BatchSession) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    pub fn expire_stale(&self) -> usize {
        self.expire_stale_after(self.settings.timeout_secs)
    }

    pub fn expire_stale_after(&self, timeout_secs: u64) -> usize {
        let now = self.now();
        let timeout = Duration::seconds(i64::try_from(timeout_secs).unwrap_or(i64::MAX));
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_stale(s, now, timeout));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "expired stale batch sessions");
        }
        removed
    }

    pub fn delete(&self, id: &SessionId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "deleted batch session");
        }
        removed
    }

    pub fn delete_all(&self) -> usize {
        let mut sessions = self.lock();
        let count = sessions.len();
        sessions.clear();
        count
    }

    pub fn active_count(&self) -> usize {
        self.expire_stale();
        self.lock().len()
    }
}
