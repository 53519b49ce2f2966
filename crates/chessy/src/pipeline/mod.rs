//! Pipeline wiring: ingest loop, parser worker pool, dead-letter handler.
//!
//! The ingest side polls the archive location and synthesizes upload
//! events for files it has not split yet. The consume side is a pool of
//! worker slots pulling from the shared queue, each processing one chunk
//! task to completion before taking the next, so one bad chunk's blast
//! radius is bounded to its own lease.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chessy_common::emit;
use chessy_common::metrics::events::{ChunkOutcome, ChunkProcessed};
use chessy_common::polling::{IterationResult, PollingProcessor, run_polling_loop};
use chessy_common::{ObjectRecordStore, RecordStoreRef, StorageProvider, StorageProviderRef};

use crate::config::Config;
use crate::dlq::DeadLetterHandler;
use crate::error::PipelineError;
use crate::parser::{ChunkDisposition, ChunkWorker};
use crate::queue::{WorkQueue, Lease};
use crate::splitter::{Splitter, UploadEvent};

/// How long an idle worker waits before polling the queue again.
const RECEIVE_IDLE_WAIT: Duration = Duration::from_millis(250);

/// Polls the archive location and splits newly arrived files.
///
/// A file is marked seen only after a successful split, so a storage
/// error this iteration leaves it eligible for retry on the next poll
/// with no side effects recorded.
pub struct IngestProcessor {
    storage: StorageProviderRef,
    splitter: Splitter,
    seen: HashSet<String>,
}

impl IngestProcessor {
    pub fn new(storage: StorageProviderRef, splitter: Splitter) -> Self {
        Self {
            storage,
            splitter,
            seen: HashSet::new(),
        }
    }
}

#[async_trait]
impl PollingProcessor for IngestProcessor {
    type State = Vec<String>;
    type Error = PipelineError;

    async fn prepare(&mut self) -> Result<Option<Self::State>, Self::Error> {
        let keys = self.storage.list(None).await?;
        let pending: Vec<String> = keys
            .into_iter()
            .filter(|key| key.ends_with(".pgn") && !self.seen.contains(key))
            .collect();

        if pending.is_empty() {
            return Ok(None);
        }
        info!(files = pending.len(), "Found archives to split");
        Ok(Some(pending))
    }

    async fn process(&mut self, keys: Self::State) -> Result<IterationResult, Self::Error> {
        for key in keys {
            let event = UploadEvent {
                bucket: self.storage.url().to_string(),
                object_key: key.clone(),
            };
            match self.splitter.split_file(&event).await {
                Ok(_) => {
                    self.seen.insert(key);
                }
                Err(e) => {
                    // Not marked seen; the next poll retries this file
                    warn!(key = %key, error = %e, "Failed to split archive, will retry");
                }
            }
        }
        Ok(IterationResult::ProcessedItems)
    }
}

/// Spawn the parser worker pool.
///
/// Each worker owns nothing but its current lease; a crashed or cancelled
/// worker's lease simply expires and the task is redelivered elsewhere.
pub fn spawn_workers(
    count: usize,
    queue: Arc<WorkQueue>,
    worker: Arc<ChunkWorker>,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|slot| {
            let queue = queue.clone();
            let worker = worker.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(worker_loop(slot, queue, worker, shutdown))
        })
        .collect()
}

async fn worker_loop(
    slot: usize,
    queue: Arc<WorkQueue>,
    worker: Arc<ChunkWorker>,
    shutdown: CancellationToken,
) {
    debug!(slot, "Parser worker started");
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match queue.receive() {
            Some(lease) => process_lease(&queue, &worker, lease).await,
            None => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(RECEIVE_IDLE_WAIT) => {}
                }
            }
        }
    }
    debug!(slot, "Parser worker stopped");
}

/// Process one lease: ack on any terminal disposition, skip the ack on
/// transient errors so the visibility timeout drives a redelivery.
async fn process_lease(queue: &WorkQueue, worker: &ChunkWorker, lease: Lease) {
    match worker.process(&lease.task).await {
        Ok(disposition) => {
            let outcome = match disposition {
                ChunkDisposition::Success => ChunkOutcome::Success,
                ChunkDisposition::AllMalformed => ChunkOutcome::PermanentFailure,
            };
            if queue.ack(&lease) {
                emit!(ChunkProcessed {
                    outcome,
                    component: "parser",
                });
            } else {
                // Lease expired mid-processing; the redelivery will redo
                // the same idempotent writes
                debug!(
                    file_id = %lease.task.file_id,
                    chunk_index = lease.task.chunk_index,
                    "Stale ack after lease expiry"
                );
            }
        }
        Err(e) => {
            warn!(
                file_id = %lease.task.file_id,
                chunk_index = lease.task.chunk_index,
                delivery_count = lease.delivery_count,
                error = %e,
                "Transient chunk failure, leaving task for redelivery"
            );
            emit!(ChunkProcessed {
                outcome: ChunkOutcome::Retried,
                component: "parser",
            });
        }
    }
}

/// Run the whole pipeline until a shutdown signal arrives.
pub async fn run_pipeline(config: Config) -> Result<(), PipelineError> {
    let source_storage: StorageProviderRef =
        Arc::new(StorageProvider::for_url(&config.source.path).await?);
    let store_storage: StorageProviderRef =
        Arc::new(StorageProvider::for_url(&config.store.path).await?);
    let store: RecordStoreRef = Arc::new(ObjectRecordStore::new(store_storage));

    let queue = Arc::new(WorkQueue::new(config.queue.to_queue_config()));
    let shutdown = CancellationToken::new();

    // Ingest loop
    let splitter = Splitter::new(
        source_storage.clone(),
        queue.clone(),
        config.splitter.chunk_size,
    );
    let mut ingest = IngestProcessor::new(source_storage, splitter);
    let poll_interval = Duration::from_secs(config.source.poll_interval_secs);
    let ingest_shutdown = shutdown.clone();
    let ingest_handle = tokio::spawn(async move {
        run_polling_loop(&mut ingest, poll_interval, ingest_shutdown, "ingest").await
    });

    // Parser worker pool
    let chunk_worker = Arc::new(ChunkWorker::new(store.clone(), config.store.tables.clone()));
    let worker_handles = spawn_workers(
        config.workers,
        queue.clone(),
        chunk_worker,
        shutdown.clone(),
    );

    // Dead-letter handler
    let dlq_handler = DeadLetterHandler::new(queue, store, config.store.tables.clone());
    let dlq_interval = Duration::from_secs(config.queue.dlq_poll_interval_secs);
    let dlq_shutdown = shutdown.clone();
    let dlq_handle =
        tokio::spawn(async move { dlq_handler.run(dlq_interval, dlq_shutdown).await });

    info!(workers = config.workers, "Pipeline started");

    chessy_common::shutdown_signal().await;
    info!("Shutting down pipeline");
    shutdown.cancel();

    for handle in worker_handles {
        handle.await.map_err(|source| PipelineError::TaskJoin { source })?;
    }
    dlq_handle
        .await
        .map_err(|source| PipelineError::TaskJoin { source })?;
    ingest_handle
        .await
        .map_err(|source| PipelineError::TaskJoin { source })??;

    Ok(())
}
