//! Canvas connector.
//!
//! Talks to the Canvas REST API with a bearer token resolved from the
//! credential vault. Assignment listing follows the `Link` response
//! header's `rel="next"` cursor page by page until the remote stops
//! sending one.

use async_trait::async_trait;
use campus_core::models::{Account, Assignment, AssignmentStatus, Course, LmsKind, SubmissionKind};
use campus_core::sync::traits::LmsClient;
use campus_core::vault::CredentialVault;
use campus_core::{Error, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Deserialize, Clone)]
struct CanvasAssignment {
    id: i64,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    due_at: Option<String>,
    course_id: i64,
    #[serde(default)]
    points_possible: Option<f64>,
    #[serde(default)]
    submission_types: Vec<String>,
    #[serde(default)]
    workflow_state: String,
}

impl CanvasAssignment {
    /// Normalize one raw record against its course context.
    ///
    /// Pure mapping: unparseable dates become `None`, unknown codes map to
    /// the `Other` catch-alls. The remote numeric id is not part of the
    /// canonical identity.
    fn into_assignment(self, course: &Course) -> Result<Assignment> {
        tracing::trace!(remote_id = self.id, title = %self.name, "normalizing canvas assignment");
        let submission_kind = self
            .submission_types
            .first()
            .map(|code| SubmissionKind::from_remote(code))
            .unwrap_or(SubmissionKind::None);

        Assignment::new(
            course.lms_kind,
            course.base_url.clone(),
            self.name,
            self.description,
            parse_timestamp(self.due_at.as_deref()),
            submission_kind,
            AssignmentStatus::from_remote(&self.workflow_state),
            self.points_possible.map(|p| p.trunc() as i64),
            self.course_id.to_string(),
            course.label().to_string(),
            parse_timestamp(self.created_at.as_deref()),
            parse_timestamp(self.updated_at.as_deref()),
            course.time_zone.clone(),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
struct CanvasCourse {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default)]
    time_zone: Option<String>,
}

impl CanvasCourse {
    fn into_course(self, lms_kind: LmsKind, base_url: &str) -> Result<Course> {
        Course::new(
            self.id.to_string(),
            base_url,
            lms_kind,
            self.name,
            self.original_name,
            self.time_zone,
            true,
        )
    }
}

/// Strict timestamp parse; absent or malformed values become `None`.
fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract the `rel="next"` target from a `Link` response header.
fn next_page_target(link_header: &str) -> Option<String> {
    let re = Regex::new(r#"<(.*?)>; rel="next""#).expect("valid link pattern");
    re.captures(link_header).map(|c| c[1].to_string())
}

/// Servers may send the next URL absolute or relative; a relative one is
/// resolved against the page it came from before reuse.
fn resolve_next_url(current: &Url, raw: &str) -> Result<Url> {
    Url::parse(raw)
        .or_else(|_| current.join(raw))
        .map_err(|e| Error::InvalidEndpoint(format!("next page url '{raw}': {e}")))
}

pub struct CanvasClient {
    client: Client,
    vault: Arc<dyn CredentialVault>,
}

impl CanvasClient {
    pub fn new(vault: Arc<dyn CredentialVault>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self { client, vault }
    }

    fn token_for(&self, account: &Account) -> Result<String> {
        self.vault.read(&account.credential_ref).ok_or_else(|| {
            Error::MissingCredential(format!("no vault entry for account '{}'", account.id))
        })
    }

    fn endpoint(account: &Account, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}",
            account.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| Error::InvalidEndpoint(format!("{raw}: {e}")))
    }

    async fn fetch_assignment_page(
        &self,
        url: Url,
        token: &str,
    ) -> Result<(Vec<CanvasAssignment>, Option<Url>)> {
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(Error::transport_reqwest)?
            .error_for_status()
            .map_err(Error::transport_reqwest)?;

        // The cursor lives in the headers, so read it before consuming the body.
        let next = resp
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_target)
            .map(|raw| resolve_next_url(&url, &raw))
            .transpose()?;

        let bytes = resp.bytes().await.map_err(Error::transport_reqwest)?;
        if bytes.is_empty() {
            return Err(Error::NoData(format!("empty body from {url}")));
        }
        let page: Vec<CanvasAssignment> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::decode("canvas assignment page", e))?;
        Ok((page, next))
    }
}

#[async_trait]
impl LmsClient for CanvasClient {
    fn kind(&self) -> LmsKind {
        LmsKind::Canvas
    }

    #[instrument(level = "debug", skip(self, token))]
    async fn validate_token(&self, base_url: &str, token: &str) -> bool {
        let raw = format!("{}/users/self", base_url.trim_end_matches('/'));
        let Ok(url) = Url::parse(&raw) else {
            return false;
        };
        match self.client.get(url).bearer_auth(token).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(_) => false,
        }
    }

    #[instrument(level = "info", skip(self, account), fields(account_id = %account.id))]
    async fn list_courses(&self, account: &Account) -> Result<Vec<Course>> {
        let token = self.token_for(account)?;
        let url = Self::endpoint(account, "courses")?;

        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(&token)
            .send()
            .await
            .map_err(Error::transport_reqwest)?
            .error_for_status()
            .map_err(Error::transport_reqwest)?;

        let bytes = resp.bytes().await.map_err(Error::transport_reqwest)?;
        if bytes.is_empty() {
            return Err(Error::NoData(format!("empty body from {url}")));
        }
        let remote: Vec<CanvasCourse> =
            serde_json::from_slice(&bytes).map_err(|e| Error::decode("canvas course list", e))?;

        remote
            .into_iter()
            .map(|c| c.into_course(account.lms_kind, &account.base_url))
            .collect()
    }

    #[instrument(
        level = "info",
        skip(self, account, course),
        fields(account_id = %account.id, course_id = %course.id)
    )]
    async fn list_assignments(
        &self,
        account: &Account,
        course: &Course,
    ) -> Result<Vec<Assignment>> {
        let token = self.token_for(account)?;
        let mut next = Some(Self::endpoint(
            account,
            &format!("courses/{}/assignments", course.id),
        )?);

        // Union of all pages, deduplicated by identity; first occurrence wins.
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        let mut pages = 0u32;
        while let Some(url) = next.take() {
            let (page, next_url) = self.fetch_assignment_page(url, &token).await?;
            pages += 1;
            for raw in page {
                let assignment = raw.into_assignment(course)?;
                if seen.insert(assignment.id.clone()) {
                    all.push(assignment);
                }
            }
            next = next_url;
        }
        tracing::debug!(pages, assignments = all.len(), "canvas assignment fetch complete");
        Ok(all)
    }
}
