//! End-to-end pipeline tests: uploaded archive in, record store state out.
//!
//! Each test wires the real splitter, queue, chunk worker, and dead-letter
//! handler together over local storage and an in-memory record store, then
//! drives the queue by hand so timing stays deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::time::advance;

use chessy::dlq::DeadLetterHandler;
use chessy::parser::{ChunkDisposition, ChunkWorker};
use chessy::queue::{WorkQueue, WorkQueueConfig};
use chessy::splitter::{Splitter, UploadEvent, split_games};
use chessy_common::error::StoreError;
use chessy_common::{MemoryRecordStore, RecordStore, StorageProvider, TableNames};

const VISIBILITY: Duration = Duration::from_secs(30);

fn game(n: u32) -> String {
    format!(
        "[Event \"Club Championship\"]\n[White \"White{n}\"]\n[Black \"Black{n}\"]\n\n1. e4 e5 2. Nf3 1-0"
    )
}

fn archive(count: u32) -> String {
    (0..count).map(game).collect::<Vec<_>>().join("\n\n")
}

struct Harness {
    splitter: Splitter,
    queue: Arc<WorkQueue>,
    worker: ChunkWorker,
    store: Arc<MemoryRecordStore>,
    tables: TableNames,
}

async fn harness(contents: &str, chunk_size: usize) -> Harness {
    let store = Arc::new(MemoryRecordStore::new());
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageProvider::for_url(dir.path().to_str().unwrap())
        .await
        .unwrap();
    storage
        .put("upload.pgn", Bytes::from(contents.to_string()))
        .await
        .unwrap();
    // Leak the tempdir so the storage outlives this helper
    std::mem::forget(dir);

    let queue = Arc::new(WorkQueue::new(WorkQueueConfig {
        visibility_timeout: VISIBILITY,
        max_receive_count: 2,
    }));
    let tables = TableNames::default();
    let splitter = Splitter::new(Arc::new(storage), queue.clone(), chunk_size);
    let worker = ChunkWorker::new(store.clone(), tables.clone());

    Harness {
        splitter,
        queue,
        worker,
        store,
        tables,
    }
}

fn upload() -> UploadEvent {
    UploadEvent {
        bucket: "chessy-pgn-files".into(),
        object_key: "upload.pgn".into(),
    }
}

/// Drain the work queue the way a worker slot does: process, then ack on
/// any terminal disposition.
async fn drain(h: &Harness) {
    while let Some(lease) = h.queue.receive() {
        h.worker.process(&lease.task).await.unwrap();
        assert!(h.queue.ack(&lease));
    }
}

/// A record store that refuses writes while the flag is set.
///
/// Stands in for an unavailable backing store so the transient failure
/// path (no ack, redelivery, eventual dead-letter) can be exercised.
struct FlakyRecordStore {
    inner: MemoryRecordStore,
    failing: AtomicBool,
}

impl FlakyRecordStore {
    fn new() -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            failing: AtomicBool::new(true),
        }
    }

    fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    fn unavailable(&self) -> StoreError {
        StoreError::StoreStorage {
            source: chessy_common::error::StorageError::Io {
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "store down"),
            },
        }
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn put(&self, table: &str, id: &str, document: Value) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(self.unavailable());
        }
        self.inner.put(table, id, document).await
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(table, id).await
    }

    async fn scan(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.scan(table).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_split_parse_persist_round_trip() {
    let h = harness(&archive(9), 4).await;

    let summary = h.splitter.split_file(&upload()).await.unwrap();
    assert_eq!(summary.games, 9);
    assert_eq!(summary.chunks, 3);

    drain(&h).await;
    assert!(h.queue.is_idle());

    assert_eq!(h.store.len(&h.tables.games), 9);
    assert_eq!(h.store.len(&h.tables.games_succeeded), 9);
    assert_eq!(h.store.len(&h.tables.pgn_files_succeeded), 3);
    assert!(h.store.is_empty(&h.tables.pgn_files_failed));

    // Ids are derived from position, so a specific game is addressable
    let doc = h
        .store
        .get(&h.tables.games, "upload.pgn-0001-0002")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["White"], "White6");
    assert_eq!(doc["sourceFileId"], "upload.pgn");
    assert_eq!(doc["sourceChunkIndex"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_chunk_leaves_one_record_set() {
    let h = harness(&archive(2), 2).await;
    h.splitter.split_file(&upload()).await.unwrap();

    // First delivery completes its writes but the ack never lands
    let first = h.queue.receive().unwrap();
    h.worker.process(&first.task).await.unwrap();
    advance(VISIBILITY + Duration::from_secs(1)).await;
    assert!(!h.queue.ack(&first));

    // Redelivery redoes the same work and acks
    let second = h.queue.receive().unwrap();
    assert_eq!(second.delivery_count, 2);
    h.worker.process(&second.task).await.unwrap();
    assert!(h.queue.ack(&second));

    assert!(h.queue.is_idle());
    assert_eq!(h.store.len(&h.tables.games), 2);
    assert_eq!(h.store.len(&h.tables.pgn_files_succeeded), 1);
}

#[tokio::test(start_paused = true)]
async fn test_all_malformed_chunk_writes_one_failure_and_acks() {
    let h = harness("this is not pgn at all", 1).await;
    h.splitter.split_file(&upload()).await.unwrap();

    let lease = h.queue.receive().unwrap();
    let disposition = h.worker.process(&lease.task).await.unwrap();
    assert_eq!(disposition, ChunkDisposition::AllMalformed);
    assert!(h.queue.ack(&lease));

    assert!(h.queue.is_idle());
    assert!(h.store.is_empty(&h.tables.games));
    assert_eq!(h.store.len(&h.tables.pgn_files_failed), 1);
    assert_eq!(h.store.len(&h.tables.games_failed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_dead_letters_and_records_one_failure() {
    let flaky = Arc::new(FlakyRecordStore::new());

    let dir = tempfile::tempdir().unwrap();
    let storage = StorageProvider::for_url(dir.path().to_str().unwrap())
        .await
        .unwrap();
    storage
        .put("upload.pgn", Bytes::from(archive(2)))
        .await
        .unwrap();
    std::mem::forget(dir);

    let queue = Arc::new(WorkQueue::new(WorkQueueConfig {
        visibility_timeout: VISIBILITY,
        max_receive_count: 2,
    }));
    let tables = TableNames::default();
    let splitter = Splitter::new(Arc::new(storage), queue.clone(), 2);
    let worker = ChunkWorker::new(flaky.clone(), tables.clone());

    splitter.split_file(&upload()).await.unwrap();

    // Every delivery hits the outage; the lease is never acked
    for expected in 1..=3 {
        let lease = queue.receive().unwrap();
        assert_eq!(lease.delivery_count, expected);
        assert!(worker.process(&lease.task).await.is_err());
        advance(VISIBILITY + Duration::from_secs(1)).await;
    }

    // Budget spent: the next sweep redrives to the dead-letter queue
    assert!(queue.receive().is_none());
    assert_eq!(queue.dead_len(), 1);

    // Store recovers before the dead-letter handler runs
    flaky.recover();
    let handler = DeadLetterHandler::new(queue.clone(), flaky.clone(), tables.clone());
    let recorded = handler.drain().await.unwrap();
    assert_eq!(recorded, 1);
    assert!(queue.is_idle());

    // Exactly one failure record, zero game records
    assert!(flaky.inner.is_empty(&tables.games));
    assert_eq!(flaky.inner.len(&tables.pgn_files_failed), 1);
    let doc = flaky
        .inner
        .get(&tables.pgn_files_failed, "upload.pgn-0000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["reason"], "retries exhausted");
    // The raw payload survives for manual replay
    let replayed: Vec<String> = split_games(doc["rawPayload"].as_str().unwrap()).collect();
    assert_eq!(replayed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rerun_after_partial_processing_adds_nothing() {
    let h = harness(&archive(4), 2).await;
    h.splitter.split_file(&upload()).await.unwrap();

    // Process only the first chunk, then the splitter runs again
    let lease = h.queue.receive().unwrap();
    h.worker.process(&lease.task).await.unwrap();
    assert!(h.queue.ack(&lease));

    let rerun = h.splitter.split_file(&upload()).await.unwrap();
    assert_eq!(rerun.duplicates, 2);
    assert_eq!(h.queue.len(), 1);

    drain(&h).await;
    assert_eq!(h.store.len(&h.tables.games), 4);
}
