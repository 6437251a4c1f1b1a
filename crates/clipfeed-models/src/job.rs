use crate::{Id, OpaqueJson};

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Failed,
    Rejected,
    Cancelled,
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "complete" => Self::Complete,
            "failed" => Self::Failed,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }

    /// Terminal statuses are eligible for `Dismiss` (§4.4) and purge (§4.4
    /// Admin purge).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Rejected | Self::Cancelled
        )
    }
}

/// Job is a unit of external work claimed by a worker process (§3, §4.4).
///
/// Invariants enforced by the application layer: a job in `Running` has
/// `started_at` set and `attempts >= 1`; `completed_at` is set exactly
/// when the status transitions to a terminal state; a job is never
/// claimed by more than one caller (linearizable claim, §5).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub id: Id,
    pub source_id: Id,
    pub job_type: String,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: Option<OpaqueJson>,
    pub result: Option<OpaqueJson>,
    pub error: Option<String>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_after: Option<chrono::DateTime<chrono::Utc>>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
    pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

    /// §4.4 invariant check, useful in tests and as a debug assertion at
    /// the repository boundary.
    pub fn running_invariant_holds(&self) -> bool {
        if self.status != JobStatus::Running {
            return true;
        }
        self.started_at.is_some() && self.attempts >= 1
    }
}

/// The body of a worker's `PUT /api/internal/jobs/{id}` update (§4.4).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub error: Option<String>,
    pub result: Option<OpaqueJson>,
    pub run_after: Option<chrono::DateTime<chrono::Utc>>,
}

/// Outcome counts returned by the stale watchdog (§4.4).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReclaimCounts {
    pub requeued: u64,
    pub failed: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Rejected.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
