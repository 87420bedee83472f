//! Durable set of canonical assignments, keyed by identity hash.
//!
//! Persisted layout is a single JSON array. Reload reconstructs the
//! in-memory set record by record, dropping anything that fails to decode:
//! a corrupt cache entry is recoverable by a future sync, not fatal.

use crate::models::Assignment;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct AssignmentStore {
    path: PathBuf,
    assignments: RwLock<HashMap<String, Assignment>>,
}

impl AssignmentStore {
    #[tracing::instrument(level = "debug")]
    pub fn open(path: impl Into<PathBuf> + std::fmt::Debug) -> Self {
        let path = path.into();
        let assignments = Self::load(&path);
        Self {
            path,
            assignments: RwLock::new(assignments),
        }
    }

    fn load(path: &Path) -> HashMap<String, Assignment> {
        let Ok(bytes) = std::fs::read(path) else {
            return HashMap::new();
        };
        let raw: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "assignment file failed to decode, starting empty");
                return HashMap::new();
            }
        };
        let mut assignments = HashMap::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Assignment>(value) {
                Ok(assignment) => {
                    assignments.insert(assignment.id.clone(), assignment);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "dropping malformed assignment record");
                }
            }
        }
        assignments
    }

    fn persist(&self, assignments: &HashMap<String, Assignment>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create store dir", e))?;
        }
        let records: Vec<&Assignment> = assignments.values().collect();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| Error::storage("serialize assignments", e))?;
        std::fs::write(&self.path, bytes).map_err(|e| Error::storage("write assignment file", e))
    }

    /// Set union by identity. An id already present keeps its stored entity
    /// untouched; the file is rewritten only when cardinality changed.
    /// Returns the number of newly inserted assignments.
    #[tracing::instrument(level = "debug", skip(self, new_assignments), fields(incoming = new_assignments.len()))]
    pub fn merge(&self, new_assignments: Vec<Assignment>) -> Result<u64> {
        let mut assignments = self.assignments.write();
        let before = assignments.len();
        for assignment in new_assignments {
            assignments
                .entry(assignment.id.clone())
                .or_insert(assignment);
        }
        let inserted = (assignments.len() - before) as u64;
        if inserted > 0 {
            self.persist(&assignments)?;
        }
        Ok(inserted)
    }

    /// Unordered snapshot.
    pub fn all(&self) -> Vec<Assignment> {
        self.assignments.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Assignment> {
        self.assignments.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.assignments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.read().is_empty()
    }

    /// Ascending by due date; undated assignments sort after all dated ones.
    pub fn sorted_by_due_date(&self) -> Vec<Assignment> {
        let mut out = self.all();
        out.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        out
    }

    /// Assignments due strictly after `cutoff`, ascending. Undated
    /// assignments are excluded entirely.
    pub fn due_after(&self, cutoff: DateTime<Utc>) -> Vec<Assignment> {
        let mut out: Vec<Assignment> = self
            .assignments
            .read()
            .values()
            .filter(|a| matches!(a.due_date, Some(due) if due > cutoff))
            .cloned()
            .collect();
        out.sort_by_key(|a| a.due_date);
        out
    }

    /// Remove assignments due strictly before `cutoff`. Undated assignments
    /// are never pruned. Returns the number removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut assignments = self.assignments.write();
        let before = assignments.len();
        assignments.retain(|_, a| match a.due_date {
            Some(due) => due >= cutoff,
            None => true,
        });
        let removed = (before - assignments.len()) as u64;
        if removed > 0 {
            self.persist(&assignments)?;
        }
        Ok(removed)
    }

    /// Remove every assignment matching both `course_id` and `base_url`
    /// exactly. Used when an account or course is deleted or disabled.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn delete_for_course(&self, course_id: &str, base_url: &str) -> Result<u64> {
        let mut assignments = self.assignments.write();
        let before = assignments.len();
        assignments.retain(|_, a| !(a.course_id == course_id && a.source_base_url == base_url));
        let removed = (before - assignments.len()) as u64;
        if removed > 0 {
            self.persist(&assignments)?;
        }
        Ok(removed)
    }

    /// Attach breakdown text to a stored assignment. This is the one
    /// permitted post-construction mutation; the change is persisted
    /// immediately.
    #[tracing::instrument(level = "debug", skip(self, breakdown))]
    pub fn set_breakdown(&self, id: &str, breakdown: impl Into<String>) -> Result<()> {
        let mut assignments = self.assignments.write();
        let assignment = assignments
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("assignment '{id}' not found")))?;
        assignment.breakdown = Some(breakdown.into());
        self.persist(&assignments)
    }
}
