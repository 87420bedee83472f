use crate::models::{Account, Course, LmsKind};
use crate::registry::AccountRegistry;
use crate::store::AssignmentStore;
use crate::sync::models::{CourseSyncOutcome, SyncRun};
use crate::sync::traits::LmsClient;
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Drives synchronization passes over the registry's enabled accounts.
///
/// Clients are registered per `LmsKind`; the registry and store are shared
/// services passed in at construction, never ambient globals.
pub struct SyncEngine {
    registry: Arc<AccountRegistry>,
    store: Arc<AssignmentStore>,
    clients: RwLock<HashMap<LmsKind, Arc<dyn LmsClient>>>,
}

impl SyncEngine {
    pub fn new(registry: Arc<AccountRegistry>, store: Arc<AssignmentStore>) -> Self {
        Self {
            registry,
            store,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the client implementation for its LMS kind.
    pub async fn register_client(&self, client: Arc<dyn LmsClient>) {
        let mut clients = self.clients.write().await;
        clients.insert(client.kind(), client);
    }

    async fn get_client(&self, kind: LmsKind) -> Result<Arc<dyn LmsClient>> {
        let clients = self.clients.read().await;
        clients
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no client registered for lms kind '{kind}'")))
    }

    /// Run one synchronization pass for `kind`.
    ///
    /// Every enabled course of every enabled account is fetched
    /// concurrently; pagination inside each fetch stays sequential. A
    /// course's failure is recorded in the run and the pass continues.
    /// Results are merged into the store only after the course's fetch
    /// fully succeeded.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync(&self, kind: LmsKind) -> Result<SyncRun> {
        let client = self.get_client(kind).await?;
        let mut run = SyncRun::new_running(kind, Utc::now());

        let mut jobs: Vec<(Account, Course)> = Vec::new();
        for account in self.registry.enabled_accounts_for(kind) {
            for course in account.courses.iter().filter(|c| c.enabled) {
                jobs.push((account.clone(), course.clone()));
            }
        }

        let outcomes = futures::future::join_all(jobs.into_iter().map(|(account, course)| {
            let client = client.clone();
            let store = self.store.clone();
            async move { sync_course(client, store, account, course).await }
        }))
        .await;

        run.finish(outcomes, Utc::now());
        tracing::info!(
            run_id = %run.run_id,
            status = ?run.status,
            fetched = run.fetched(),
            merged = run.merged(),
            "sync pass finished"
        );
        Ok(run)
    }

    /// Fetch the remote course list and replace the registry entry,
    /// keeping the enabled flag the user chose for courses that survive
    /// the refresh.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn refresh_courses(&self, account_id: Uuid) -> Result<Vec<Course>> {
        let account = self
            .registry
            .get_account(account_id)
            .ok_or_else(|| Error::NotFound(format!("account '{account_id}' not found")))?;
        let client = self.get_client(account.lms_kind).await?;

        let mut fetched = client.list_courses(&account).await?;
        for course in fetched.iter_mut() {
            if let Some(known) = account
                .courses
                .iter()
                .find(|c| c.id == course.id && c.base_url == course.base_url)
            {
                course.enabled = known.enabled;
            }
        }
        self.registry.update_courses(account_id, fetched)
    }

    /// Remove an account: purge its cached assignments course by course,
    /// then drop the account (which deletes its vault entry). Unknown ids
    /// are a silent no-op, matching the registry.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn remove_account(&self, id: Uuid) -> Result<()> {
        if let Some(account) = self.registry.get_account(id) {
            for course in &account.courses {
                self.store.delete_for_course(&course.id, &course.base_url)?;
            }
        }
        self.registry.remove_account(id)
    }

    /// Enable or disable a single course. Disabling also purges that
    /// course's cached assignments.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn set_course_enabled(
        &self,
        account_id: Uuid,
        course_id: &str,
        enabled: bool,
    ) -> Result<Vec<Course>> {
        let account = self
            .registry
            .get_account(account_id)
            .ok_or_else(|| Error::NotFound(format!("account '{account_id}' not found")))?;

        let mut courses = account.courses;
        let course = courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| Error::NotFound(format!("course '{course_id}' not found")))?;
        course.enabled = enabled;
        let base_url = course.base_url.clone();

        let stored = self.registry.update_courses(account_id, courses)?;
        if !enabled {
            self.store.delete_for_course(course_id, &base_url)?;
        }
        Ok(stored)
    }
}

async fn sync_course(
    client: Arc<dyn LmsClient>,
    store: Arc<AssignmentStore>,
    account: Account,
    course: Course,
) -> CourseSyncOutcome {
    let mut outcome = CourseSyncOutcome {
        account_id: account.id,
        course_id: course.id.clone(),
        course_name: course.label().to_string(),
        fetched: 0,
        merged: 0,
        error: None,
    };

    match client.list_assignments(&account, &course).await {
        Ok(assignments) => {
            outcome.fetched = assignments.len() as u64;
            match store.merge(assignments) {
                Ok(merged) => outcome.merged = merged,
                Err(e) => {
                    tracing::warn!(account_id = %account.id, course_id = %course.id, error = %e, "merge failed");
                    outcome.error = Some(e.to_string());
                }
            }
        }
        Err(e) => {
            tracing::warn!(account_id = %account.id, course_id = %course.id, error = %e, "course fetch failed");
            outcome.error = Some(e.to_string());
        }
    }
    outcome
}
