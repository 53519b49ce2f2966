//! Dead-letter handler.
//!
//! Terminal stage of the failure path: tasks that exhausted their
//! delivery budget land on the dead-letter queue and are converted into
//! permanent failure records. Nothing is ever retried from here, and
//! nothing is ever silently dropped: every dead-lettered task becomes
//! exactly one failure record (idempotently, since the DLQ itself can
//! deliver a task twice).

use chrono::Utc;
use serde_json::Value;
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chessy_common::error::{StoreError, StoreSerializeSnafu};
use chessy_common::{RecordStoreRef, TableNames, emit};
use chessy_common::metrics::events::{ChunkOutcome, ChunkProcessed};

use crate::queue::{ChunkTask, WorkQueue};
use crate::records::{FailureRecord, chunk_failure_id};

/// Failure reason recorded for every dead-lettered chunk.
const RETRIES_EXHAUSTED: &str = "retries exhausted";

/// Converts exhausted chunk tasks into permanent failure records.
pub struct DeadLetterHandler {
    queue: Arc<WorkQueue>,
    store: RecordStoreRef,
    tables: TableNames,
}

impl DeadLetterHandler {
    pub fn new(queue: Arc<WorkQueue>, store: RecordStoreRef, tables: TableNames) -> Self {
        Self {
            queue,
            store,
            tables,
        }
    }

    /// Drain everything currently receivable from the dead-letter queue.
    ///
    /// Per task: exactly one record store write, then exactly one queue
    /// deletion. A store failure leaves the lease unacked, so the DLQ
    /// redelivers and the deterministic failure id makes the second write
    /// an overwrite.
    pub async fn drain(&self) -> Result<usize, StoreError> {
        let mut recorded = 0;
        while let Some(lease) = self.queue.receive_dead() {
            self.record_exhausted(&lease.task).await?;
            self.queue.ack_dead(&lease);
            recorded += 1;

            emit!(ChunkProcessed {
                outcome: ChunkOutcome::PermanentFailure,
                component: "dead_letter_handler",
            });
            info!(
                file_id = %lease.task.file_id,
                chunk_index = lease.task.chunk_index,
                "Recorded dead-lettered chunk as failed"
            );
        }
        Ok(recorded)
    }

    /// Run until shutdown, draining the dead-letter queue periodically.
    pub async fn run(&self, poll_interval: Duration, shutdown: CancellationToken) {
        loop {
            if let Err(e) = self.drain().await {
                warn!(error = %e, "Dead-letter drain failed, will retry");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    async fn record_exhausted(&self, task: &ChunkTask) -> Result<(), StoreError> {
        let id = chunk_failure_id(&task.file_id, task.chunk_index);
        let failure = FailureRecord {
            id: id.clone(),
            source_file_id: task.file_id.clone(),
            source_chunk_index: task.chunk_index,
            reason: RETRIES_EXHAUSTED.to_string(),
            raw_payload: task.games.join("\n\n"),
            failed_at: Utc::now(),
        };

        let table = &self.tables.pgn_files_failed;
        let document: Value =
            serde_json::to_value(&failure).context(StoreSerializeSnafu { table, id: &id })?;
        self.store.put(table, &id, document).await
    }
}
