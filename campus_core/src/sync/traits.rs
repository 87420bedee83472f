use crate::Result;
use crate::models::{Account, Assignment, Course, LmsKind};
use async_trait::async_trait;

/// Protocol-specific client for one LMS kind.
///
/// Implementations live in `campus_integrations` or caller code. The engine
/// is generic over this capability, not over a concrete client type.
#[async_trait]
pub trait LmsClient: Send + Sync {
    /// The LMS kind this client speaks.
    fn kind(&self) -> LmsKind;

    /// Lightweight authenticated probe. Expected auth failures yield
    /// `false`, never an error.
    async fn validate_token(&self, base_url: &str, token: &str) -> bool;

    /// List the remote courses for an account, normalized.
    ///
    /// Fails with `MissingCredential` if the vault has no entry for the
    /// account, `InvalidEndpoint` if its base URL does not parse.
    async fn list_courses(&self, account: &Account) -> Result<Vec<Course>>;

    /// Fetch every assignment page for a course, following the pagination
    /// cursor until exhausted, and return the normalized union deduplicated
    /// by identity. All-or-nothing: a failure at any page aborts the call
    /// and discards pages already fetched.
    async fn list_assignments(&self, account: &Account, course: &Course)
    -> Result<Vec<Assignment>>;
}
