//! Campus core library: canonical assignment model, durable account
//! registry and assignment store, and the sync engine that drives LMS
//! fetch passes through `LmsClient` implementations.

pub mod error;
pub mod models;
pub mod registry;
pub mod store;
pub mod sync;
pub mod vault;

pub use error::{Error, Result};
pub use models::{
    Account, Assignment, AssignmentStatus, Course, LmsKind, SubmissionKind, identity_hash,
};
pub use registry::AccountRegistry;
pub use store::AssignmentStore;
pub use sync::engine::SyncEngine;
pub use sync::models::{CourseSyncOutcome, SyncRun, SyncRunStatus};
pub use sync::traits::LmsClient;
pub use vault::{CredentialVault, MemoryVault};
