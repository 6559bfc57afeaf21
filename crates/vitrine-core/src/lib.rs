//! Vitrine core library
//!
//! Shared domain types, the per-job error taxonomy, configuration, and
//! collaborator seams used across the Vitrine upload pipeline crates.

pub mod config;
pub mod error;
pub mod models;
pub mod persistence;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::UploadError;
pub use models::{BatchSummary, EntityId, FileSource, UploadResult};
pub use persistence::ImageAttacher;
