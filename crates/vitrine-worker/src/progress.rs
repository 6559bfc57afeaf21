//! Progress/result store.
//!
//! Concurrency-safe map from entity to its current batch's results, readable
//! at any time for partial progress. Each submission owns a batch id:
//! `record` drops results whose batch has been superseded, so overlapping
//! submissions for one entity never mix. The superseded submission still
//! receives its own results through its private completion channel; only the
//! shared progress view switches to the newest batch.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

use vitrine_core::{EntityId, UploadResult};

#[derive(Debug)]
struct BatchProgress {
    batch: Uuid,
    results: Vec<UploadResult>,
}

#[derive(Debug, Default)]
pub struct ProgressStore {
    inner: RwLock<HashMap<EntityId, BatchProgress>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh, empty result list for `entity` under `batch`,
    /// superseding any prior batch for that entity.
    pub fn begin_batch(&self, entity: EntityId, batch: Uuid) {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        table.insert(
            entity,
            BatchProgress {
                batch,
                results: Vec::new(),
            },
        );
    }

    /// Append a result for `entity` if `batch` is still its current batch.
    /// Never fails; a stale-batch result is discarded.
    pub fn record(&self, entity: EntityId, batch: Uuid, result: UploadResult) {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match table.get_mut(&entity) {
            Some(progress) if progress.batch == batch => progress.results.push(result),
            _ => {
                tracing::debug!(entity, batch = %batch, "Dropping result from superseded batch");
            }
        }
    }

    /// Snapshot of the entity's current batch results, possibly partial while
    /// the batch is still running. Empty when no batch was ever submitted.
    pub fn snapshot(&self, entity: EntityId) -> Vec<UploadResult> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        table
            .get(&entity)
            .map(|progress| progress.results.clone())
            .unwrap_or_default()
    }
}
