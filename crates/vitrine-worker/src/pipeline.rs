//! Upload pipeline: bounded job queue, semaphore-gated execution, and the
//! batch orchestrator.
//!
//! Jobs enter through a bounded mpsc channel (enqueueing blocks once it is
//! full — that is the backpressure mechanism). A dispatcher task receives
//! each job, waits for one of the pool's capacity permits, and spawns the job
//! body: transcode under `spawn_blocking`, then upload. The owned permit is
//! dropped on every exit path, so in-flight concurrency can never exceed the
//! pool size regardless of queue depth.
//!
//! Shutdown: [`UploadPipeline::shutdown`] signals the dispatcher to stop; it
//! does not wait for in-flight jobs. Batches still waiting on queued jobs at
//! that point complete with an orchestration error, never with silently
//! missing results.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use vitrine_core::{
    BatchSummary, EntityId, FileSource, ImageAttacher, PipelineConfig, UploadError, UploadResult,
};
use vitrine_processing::WebpTranscoder;
use vitrine_uploader::{ImageHost, ImgbbClient};

use crate::progress::ProgressStore;

/// One file's transcode-then-upload unit of work. Created at batch
/// submission, consumed exactly once by the pool.
struct UploadJob {
    file: FileSource,
    index: usize,
    entity: EntityId,
    batch: Uuid,
    completion_tx: mpsc::Sender<UploadResult>,
}

/// Explicitly constructed upload pipeline handle.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Constructing a
/// second pipeline is legal and yields an independent pool with its own
/// queue, permits, and progress table.
pub struct UploadPipeline {
    job_tx: mpsc::Sender<UploadJob>,
    shutdown_tx: mpsc::Sender<()>,
    progress: Arc<ProgressStore>,
    batch_timeout: Duration,
}

impl UploadPipeline {
    /// Build a pipeline from configuration with the production ImgBB host.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let transcoder = WebpTranscoder::new(config.webp_quality);
        let host: Arc<dyn ImageHost> = Arc::new(ImgbbClient::new(&config)?);
        Ok(Self::new(config, transcoder, host))
    }

    /// Build a pipeline with an injected image host (tests, alternate hosts).
    pub fn new(config: PipelineConfig, transcoder: WebpTranscoder, host: Arc<dyn ImageHost>) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let progress = Arc::new(ProgressStore::new());

        let max_workers = config.max_workers.max(1);
        tokio::spawn(Self::dispatcher(
            job_rx,
            shutdown_rx,
            max_workers,
            transcoder,
            host,
            progress.clone(),
        ));

        tracing::info!(
            max_workers,
            queue_capacity = config.queue_capacity.max(1),
            "Upload pipeline started"
        );

        Self {
            job_tx,
            shutdown_tx,
            progress,
            batch_timeout: Duration::from_secs(config.batch_timeout_secs),
        }
    }

    /// Upload a batch of files for one entity and wait for every job to
    /// report. Returns exactly one result per file, in completion order;
    /// per-job failures are carried inside the results, never escalated to a
    /// batch failure. Errors only on orchestration faults (pipeline shut
    /// down, batch timeout).
    pub async fn submit_batch(
        &self,
        entity: EntityId,
        files: Vec<FileSource>,
    ) -> Result<Vec<UploadResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let batch = Uuid::new_v4();
        let total = files.len();
        self.progress.begin_batch(entity, batch);

        tracing::info!(entity, batch = %batch, files = total, "Batch submitted");

        let (completion_tx, mut completion_rx) = mpsc::channel(total);
        for (index, file) in files.into_iter().enumerate() {
            let job = UploadJob {
                file,
                index,
                entity,
                batch,
                completion_tx: completion_tx.clone(),
            };
            // Blocks when the queue is full: backpressure on the caller.
            self.job_tx
                .send(job)
                .await
                .map_err(|_| anyhow::anyhow!("upload pipeline is shut down"))?;
        }
        drop(completion_tx);

        let mut results = Vec::with_capacity(total);
        tokio::time::timeout(self.batch_timeout, async {
            while results.len() < total {
                match completion_rx.recv().await {
                    Some(result) => results.push(result),
                    None => break,
                }
            }
        })
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "batch {batch} for entity {entity} timed out after {:?}",
                self.batch_timeout
            )
        })?;

        if results.len() < total {
            // Only reachable when the pool stopped underneath us.
            anyhow::bail!(
                "upload pipeline dropped {} of {} job(s) for entity {entity}",
                total - results.len(),
                total
            );
        }

        tracing::info!(
            entity,
            batch = %batch,
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            failed = results.iter().filter(|r| !r.is_success()).count(),
            "Batch completed"
        );

        Ok(results)
    }

    /// Single-file variant (e.g. category images): one job through the same
    /// machinery. The per-job [`UploadError`] is preserved as the error
    /// source and can be recovered with `downcast_ref`.
    pub async fn submit_single(&self, entity: EntityId, file: FileSource) -> Result<String> {
        let results = self.submit_batch(entity, vec![file]).await?;
        let result = results
            .into_iter()
            .next()
            .context("missing upload result")?;
        match result.error {
            None => Ok(result.url),
            Some(error) => Err(error.into()),
        }
    }

    /// Run a batch, then hand each successful URL to the persistence
    /// collaborator. Attach failures are logged and do not fail the call.
    pub async fn submit_batch_and_attach(
        &self,
        entity: EntityId,
        files: Vec<FileSource>,
        attacher: &dyn ImageAttacher,
    ) -> Result<(Vec<UploadResult>, BatchSummary)> {
        let results = self.submit_batch(entity, files).await?;
        let summary = BatchSummary::from_results(&results);

        for result in results.iter().filter(|r| r.is_success()) {
            if let Err(e) = attacher.attach(entity, &result.url).await {
                tracing::error!(
                    entity,
                    url = %result.url,
                    error = %e,
                    "Failed to attach uploaded image URL"
                );
            }
        }

        Ok((results, summary))
    }

    /// Non-blocking snapshot of the entity's current batch results. Safe to
    /// call concurrently with an in-flight batch for the same entity.
    pub fn progress(&self, entity: EntityId) -> Vec<UploadResult> {
        self.progress.snapshot(entity)
    }

    /// Signal the dispatcher to stop. In-flight jobs finish; queued jobs are
    /// dropped and their batches surface an orchestration error.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::debug!("Upload pipeline already stopped");
        }
    }

    async fn dispatcher(
        mut job_rx: mpsc::Receiver<UploadJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
        max_workers: usize,
        transcoder: WebpTranscoder,
        host: Arc<dyn ImageHost>,
        progress: Arc<ProgressStore>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Upload pipeline shutting down");
                    break;
                }
                job = job_rx.recv() => {
                    let Some(job) = job else { break };

                    // The queue gates admission; the permit gates execution.
                    // Keep watching for shutdown while the pool is saturated,
                    // so a stop signal is not stuck behind a slow job.
                    let permit = tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Upload pipeline shutting down");
                            break;
                        }
                        acquired = semaphore.clone().acquire_owned() => {
                            let Ok(permit) = acquired else { break };
                            permit
                        }
                    };
                    tracing::debug!(
                        entity = job.entity,
                        index = job.index,
                        "Dispatching upload job"
                    );

                    let host = host.clone();
                    let progress = progress.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::process_job(job, transcoder, host, progress).await;
                    });
                }
            }
        }

        tracing::info!("Upload pipeline stopped");
    }

    async fn process_job(
        job: UploadJob,
        transcoder: WebpTranscoder,
        host: Arc<dyn ImageHost>,
        progress: Arc<ProgressStore>,
    ) {
        let UploadJob {
            file,
            index,
            entity,
            batch,
            completion_tx,
        } = job;

        let result = Self::run_job(file, index, transcoder, host.as_ref()).await;
        if let Some(error) = &result.error {
            tracing::warn!(
                entity,
                index,
                code = error.code(),
                error = %error,
                "Upload job failed"
            );
        }

        progress.record(entity, batch, result.clone());
        // The batch may have stopped waiting (timeout); dropping the send is fine.
        let _ = completion_tx.send(result).await;
    }

    async fn run_job(
        file: FileSource,
        index: usize,
        transcoder: WebpTranscoder,
        host: &dyn ImageHost,
    ) -> UploadResult {
        let FileSource { data, filename } = file;

        // Transcode is CPU-bound; run off the async pool.
        let transcoded =
            match tokio::task::spawn_blocking(move || transcoder.transcode(&data, &filename)).await
            {
                Ok(Ok(image)) => image,
                Ok(Err(error)) => return UploadResult::failure(index, error),
                Err(join_error) => {
                    return UploadResult::failure(
                        index,
                        UploadError::Encode {
                            message: format!("transcode task failed: {join_error}"),
                        },
                    )
                }
            };

        match host.upload(&transcoded).await {
            Ok(url) => UploadResult::success(index, url),
            Err(error) => UploadResult::failure(index, error),
        }
    }
}
