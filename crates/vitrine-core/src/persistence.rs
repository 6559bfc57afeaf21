//! Persistence collaborator seam.
//!
//! The pipeline never writes to the catalog itself. After a batch completes,
//! the orchestrating caller hands each successful URL to an implementation of
//! [`ImageAttacher`] (typically backed by the product/category repository).

use async_trait::async_trait;

use crate::models::EntityId;

/// Attaches a hosted image URL to a catalog record.
#[async_trait]
pub trait ImageAttacher: Send + Sync {
    async fn attach(&self, entity: EntityId, url: &str) -> anyhow::Result<()>;
}
