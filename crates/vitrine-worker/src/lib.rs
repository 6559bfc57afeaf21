//! Worker pool, progress store, and batch orchestration for Vitrine uploads.

pub mod pipeline;
pub mod progress;

pub use pipeline::UploadPipeline;
pub use progress::ProgressStore;
