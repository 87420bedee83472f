use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Supported LMS protocols. One `LmsClient` implementation exists per kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmsKind {
    Canvas,
}

impl LmsKind {
    /// Stable string form, used in the assignment identity hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            LmsKind::Canvas => "canvas",
        }
    }
}

impl std::fmt::Display for LmsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an assignment is submitted, normalized from the remote code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    TextEntry,
    FileUpload,
    Url,
    Recording,
    None,
    Other,
}

impl SubmissionKind {
    /// Total lookup over the remote submission-type code.
    ///
    /// Case-insensitive; unrecognized codes map to `Other`, never an error.
    pub fn from_remote(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "online_text_entry" => SubmissionKind::TextEntry,
            "online_upload" => SubmissionKind::FileUpload,
            "online_url" => SubmissionKind::Url,
            "media_recording" => SubmissionKind::Recording,
            "none" => SubmissionKind::None,
            _ => SubmissionKind::Other,
        }
    }
}

/// Workflow state of an assignment, normalized from the remote string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Posted,
    Submitted,
    Graded,
    Other,
}

impl AssignmentStatus {
    /// Total lookup over the remote workflow-state string (`Other` catch-all).
    pub fn from_remote(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "posted" => AssignmentStatus::Posted,
            "submitted" => AssignmentStatus::Submitted,
            "graded" => AssignmentStatus::Graded,
            _ => AssignmentStatus::Other,
        }
    }
}

/// A scoping unit under an account. Identity is `(lms_kind, base_url, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub base_url: String,
    pub lms_kind: LmsKind,
    pub display_name: Option<String>,
    pub canonical_name: Option<String>,
    pub time_zone: Option<String>,
    pub enabled: bool,
}

impl Course {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        lms_kind: LmsKind,
        display_name: Option<String>,
        canonical_name: Option<String>,
        time_zone: Option<String>,
        enabled: bool,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("course id is empty".to_string()));
        }
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::InvalidInput("course base_url is empty".to_string()));
        }
        Ok(Self {
            id,
            base_url,
            lms_kind,
            display_name,
            canonical_name,
            time_zone,
            enabled,
        })
    }

    /// Human-facing name: canonical name, then display name, then the raw id.
    pub fn label(&self) -> &str {
        self.canonical_name
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or(&self.id)
    }
}

/// A configured connection to one LMS instance.
///
/// `credential_ref` is only a lookup key into the vault; the secret itself
/// never lands in the persisted account file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub lms_kind: LmsKind,
    pub base_url: String,
    pub nickname: String,
    pub enabled: bool,
    pub courses: Vec<Course>,
    pub credential_ref: String,
}

impl Account {
    #[tracing::instrument(level = "debug")]
    pub fn new(
        lms_kind: LmsKind,
        base_url: impl Into<String> + std::fmt::Debug,
        nickname: impl Into<String> + std::fmt::Debug,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::InvalidInput("account base_url is empty".to_string()));
        }
        let nickname = nickname.into();
        if nickname.trim().is_empty() {
            return Err(Error::InvalidInput("account nickname is empty".to_string()));
        }
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            lms_kind,
            base_url,
            nickname,
            enabled: true,
            courses: Vec::new(),
            credential_ref: format!("lms-token:{id}"),
        })
    }
}

/// Content hash that identifies an assignment across repeated fetches.
///
/// Deliberately title-scoped: the remote numeric id is excluded, so edits
/// to description or dates always collapse to the same identity while a
/// title change produces a new one.
pub fn identity_hash(
    lms_kind: LmsKind,
    source_base_url: &str,
    course_id: &str,
    title: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lms_kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(source_base_url.as_bytes());
    hasher.update(b"|");
    hasher.update(course_id.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical assignment entity, independent of the originating LMS schema.
///
/// Constructed only by connector normalization (`Assignment::new`), which
/// computes the identity hash exactly once. Immutable afterwards except for
/// `breakdown`, which the store may attach post-hoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub lms_kind: LmsKind,
    pub source_base_url: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub submission_kind: SubmissionKind,
    pub status: AssignmentStatus,
    pub points_possible: Option<i64>,
    pub course_id: String,
    pub course_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub breakdown: Option<String>,
}

impl Assignment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lms_kind: LmsKind,
        source_base_url: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        due_date: Option<DateTime<Utc>>,
        submission_kind: SubmissionKind,
        status: AssignmentStatus,
        points_possible: Option<i64>,
        course_id: impl Into<String>,
        course_name: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
        time_zone: Option<String>,
    ) -> Result<Self> {
        let source_base_url = source_base_url.into();
        if source_base_url.trim().is_empty() {
            return Err(Error::InvalidInput(
                "assignment source_base_url is empty".to_string(),
            ));
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("assignment title is empty".to_string()));
        }
        let course_id = course_id.into();
        if course_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "assignment course_id is empty".to_string(),
            ));
        }

        let id = identity_hash(lms_kind, &source_base_url, &course_id, &title);
        Ok(Self {
            id,
            lms_kind,
            source_base_url,
            title,
            description,
            due_date,
            submission_kind,
            status,
            points_possible,
            course_id,
            course_name: course_name.into(),
            created_at,
            updated_at,
            time_zone,
            breakdown: None,
        })
    }
}

// Equality and set membership are defined solely by the identity hash; two
// entities with the same id are interchangeable for dedup purposes.
impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Assignment {}

impl Hash for Assignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essay(description: Option<&str>, due: Option<DateTime<Utc>>) -> Assignment {
        Assignment::new(
            LmsKind::Canvas,
            "https://x.edu/api/v1",
            "Essay",
            description.map(|s| s.to_string()),
            due,
            SubmissionKind::TextEntry,
            AssignmentStatus::Posted,
            Some(100),
            "100",
            "Writing 101",
            None,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn identity_ignores_non_identity_fields() {
        let a = essay(Some("first draft instructions"), None);
        let b = essay(Some("edited instructions"), Some(Utc::now()));
        assert_eq!(a.id, b.id);
        assert_eq!(a, b);
    }

    #[test]
    fn identity_is_title_scoped() {
        let a = essay(None, None);
        let mut renamed = essay(None, None);
        renamed = Assignment::new(
            renamed.lms_kind,
            renamed.source_base_url,
            "Essay (final)",
            None,
            None,
            renamed.submission_kind,
            renamed.status,
            renamed.points_possible,
            renamed.course_id,
            renamed.course_name,
            None,
            None,
            None,
        )
        .unwrap();
        assert_ne!(a.id, renamed.id);
    }

    #[test]
    fn identity_changes_with_source_and_course() {
        let a = essay(None, None);
        assert_ne!(
            a.id,
            identity_hash(LmsKind::Canvas, "https://y.edu/api/v1", "100", "Essay")
        );
        assert_ne!(
            a.id,
            identity_hash(LmsKind::Canvas, "https://x.edu/api/v1", "200", "Essay")
        );
    }

    #[test]
    fn submission_kind_lookup_is_total() {
        assert_eq!(
            SubmissionKind::from_remote("online_text_entry"),
            SubmissionKind::TextEntry
        );
        assert_eq!(
            SubmissionKind::from_remote("ONLINE_UPLOAD"),
            SubmissionKind::FileUpload
        );
        assert_eq!(SubmissionKind::from_remote("online_url"), SubmissionKind::Url);
        assert_eq!(
            SubmissionKind::from_remote("media_recording"),
            SubmissionKind::Recording
        );
        assert_eq!(SubmissionKind::from_remote("none"), SubmissionKind::None);
        assert_eq!(
            SubmissionKind::from_remote("on_paper"),
            SubmissionKind::Other
        );
        assert_eq!(SubmissionKind::from_remote(""), SubmissionKind::Other);
    }

    #[test]
    fn status_lookup_is_total() {
        assert_eq!(AssignmentStatus::from_remote("Posted"), AssignmentStatus::Posted);
        assert_eq!(
            AssignmentStatus::from_remote("submitted"),
            AssignmentStatus::Submitted
        );
        assert_eq!(AssignmentStatus::from_remote("graded"), AssignmentStatus::Graded);
        assert_eq!(
            AssignmentStatus::from_remote("unpublished"),
            AssignmentStatus::Other
        );
    }

    #[test]
    fn course_label_prefers_canonical_name() {
        let course = Course::new(
            "100",
            "https://x.edu/api/v1",
            LmsKind::Canvas,
            Some("WRI-101-02".to_string()),
            Some("Writing 101".to_string()),
            None,
            true,
        )
        .unwrap();
        assert_eq!(course.label(), "Writing 101");

        let course = Course::new(
            "100",
            "https://x.edu/api/v1",
            LmsKind::Canvas,
            Some("WRI-101-02".to_string()),
            None,
            None,
            true,
        )
        .unwrap();
        assert_eq!(course.label(), "WRI-101-02");

        let course = Course::new(
            "100",
            "https://x.edu/api/v1",
            LmsKind::Canvas,
            None,
            None,
            None,
            true,
        )
        .unwrap();
        assert_eq!(course.label(), "100");
    }

    #[test]
    fn account_new_generates_identity_and_vault_key() {
        let account = Account::new(LmsKind::Canvas, "https://x.edu/api/v1", "school").unwrap();
        assert!(account.enabled);
        assert!(account.courses.is_empty());
        assert_eq!(account.credential_ref, format!("lms-token:{}", account.id));
        assert!(Account::new(LmsKind::Canvas, "  ", "school").is_err());
        assert!(Account::new(LmsKind::Canvas, "https://x.edu", "").is_err());
    }
}
