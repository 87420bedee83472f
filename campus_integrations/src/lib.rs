//! LMS connector implementations for `campus_core`.

pub mod connectors;

pub use connectors::canvas::CanvasClient;
