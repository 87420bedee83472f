use crate::models::LmsKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Running,
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Outcome of one course's fetch within a pass. A failed course carries its
/// error message here instead of aborting the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSyncOutcome {
    pub account_id: Uuid,
    pub course_id: String,
    pub course_name: String,
    pub fetched: u64,
    pub merged: u64,
    pub error: Option<String>,
}

impl CourseSyncOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Report of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub lms_kind: LmsKind,
    pub status: SyncRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub courses: Vec<CourseSyncOutcome>,
}

impl SyncRun {
    pub fn new_running(lms_kind: LmsKind, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            lms_kind,
            status: SyncRunStatus::Running,
            started_at,
            finished_at: None,
            courses: Vec::new(),
        }
    }

    /// Record per-course outcomes and derive the final status. An empty
    /// pass (nothing enabled) counts as succeeded.
    pub fn finish(&mut self, courses: Vec<CourseSyncOutcome>, at: DateTime<Utc>) {
        let failed = courses.iter().filter(|c| !c.is_ok()).count();
        self.status = if failed == 0 {
            SyncRunStatus::Succeeded
        } else if failed == courses.len() {
            SyncRunStatus::Failed
        } else {
            SyncRunStatus::PartiallyFailed
        };
        self.courses = courses;
        self.finished_at = Some(at);
    }

    /// Total assignments fetched across all courses in this pass.
    pub fn fetched(&self) -> u64 {
        self.courses.iter().map(|c| c.fetched).sum()
    }

    /// Total assignments newly merged into the store by this pass.
    pub fn merged(&self) -> u64 {
        self.courses.iter().map(|c| c.merged).sum()
    }
}
