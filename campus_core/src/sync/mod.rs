//! Sync orchestration: the `LmsClient` capability, pass reports, and the
//! engine that drives fetch → normalize → merge for enabled accounts.

pub mod engine;
pub mod models;
pub mod traits;
