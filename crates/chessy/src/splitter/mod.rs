//! The splitter: archive file in, chunk tasks out.
//!
//! Reads an uploaded PGN archive, cuts it into individual games at the
//! blank line following each game's result token, groups the games into
//! fixed-size chunks, and enqueues one `ChunkTask` per chunk. The splitter
//! never touches the record store; its only side effect is the enqueues.

mod scan;

pub use scan::split_games;

use snafu::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

use chessy_common::StorageProviderRef;
use chessy_common::emit;
use chessy_common::metrics::events::FileSplit;

use crate::error::{ReadArchiveSnafu, SplitError};
use crate::queue::{ChunkTask, WorkQueue};
use crate::records::derive_file_id;

/// Object-creation notification, the shape the upload trigger delivers.
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub bucket: String,
    pub object_key: String,
}

/// Outcome of splitting one archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub chunks: u32,
    pub games: u32,
    /// Chunks dropped by the queue as duplicates of an earlier enqueue.
    pub duplicates: u32,
}

/// Splits uploaded archives into chunk tasks.
pub struct Splitter {
    storage: StorageProviderRef,
    queue: Arc<WorkQueue>,
    chunk_size: usize,
}

impl Splitter {
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; config validation rejects that
    /// before a splitter is ever constructed.
    pub fn new(storage: StorageProviderRef, queue: Arc<WorkQueue>, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be at least 1");
        Self {
            storage,
            queue,
            chunk_size,
        }
    }

    /// Split one uploaded file and enqueue its chunks.
    ///
    /// A storage read error fails the whole operation with no side
    /// effects; the caller retries the file later. A retry after partial
    /// enqueue is harmless because the queue drops duplicate
    /// `(file_id, chunk_index)` offers.
    pub async fn split_file(&self, event: &UploadEvent) -> Result<SplitSummary, SplitError> {
        let text = self
            .storage
            .get_string(&event.object_key)
            .await
            .context(ReadArchiveSnafu {
                key: event.object_key.clone(),
            })?;

        let file_id = derive_file_id(&event.object_key);
        let mut summary = SplitSummary {
            chunks: 0,
            games: 0,
            duplicates: 0,
        };
        let mut chunk: Vec<String> = Vec::with_capacity(self.chunk_size);

        for game in split_games(&text) {
            summary.games += 1;
            chunk.push(game);
            if chunk.len() == self.chunk_size {
                self.enqueue_chunk(&file_id, &mut summary, std::mem::take(&mut chunk));
            }
        }
        if !chunk.is_empty() {
            self.enqueue_chunk(&file_id, &mut summary, chunk);
        }

        emit!(FileSplit {
            chunks: u64::from(summary.chunks),
            games: u64::from(summary.games),
            component: "splitter",
        });
        info!(
            bucket = %event.bucket,
            key = %event.object_key,
            games = summary.games,
            chunks = summary.chunks,
            duplicates = summary.duplicates,
            "Split archive into chunk tasks"
        );

        Ok(summary)
    }

    fn enqueue_chunk(&self, file_id: &str, summary: &mut SplitSummary, games: Vec<String>) {
        let task = ChunkTask {
            file_id: file_id.to_string(),
            chunk_index: summary.chunks,
            games,
        };
        if self.queue.enqueue(task) {
            debug!(file_id, chunk_index = summary.chunks, "Enqueued chunk");
        } else {
            summary.duplicates += 1;
        }
        summary.chunks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WorkQueueConfig;
    use bytes::Bytes;
    use chessy_common::StorageProvider;

    fn game(n: u32) -> String {
        format!("[Event \"Test {n}\"]\n[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 1-0")
    }

    fn archive(count: u32) -> String {
        (0..count).map(game).collect::<Vec<_>>().join("\n\n")
    }

    async fn splitter_over(contents: &str, chunk_size: usize) -> (Splitter, Arc<WorkQueue>) {
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

        let queue = Arc::new(WorkQueue::new(WorkQueueConfig::default()));
        let splitter = Splitter::new(Arc::new(storage), queue.clone(), chunk_size);
        (splitter, queue)
    }

    fn event() -> UploadEvent {
        UploadEvent {
            bucket: "chessy-pgn-files".into(),
            object_key: "upload.pgn".into(),
        }
    }

    #[tokio::test]
    async fn test_odd_game_count_produces_short_final_chunk() {
        // 2N+1 games with chunk size N: 3 chunks, last holds 1 game
        let n = 4;
        let (splitter, queue) = splitter_over(&archive(2 * n + 1), n as usize).await;

        let summary = splitter.split_file(&event()).await.unwrap();
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.games, 2 * n + 1);
        assert_eq!(queue.len(), 3);

        let mut collected = Vec::new();
        let mut sizes = Vec::new();
        while let Some(lease) = queue.receive() {
            sizes.push(lease.task.games.len());
            collected.extend(lease.task.games.clone());
        }
        assert_eq!(sizes, vec![4, 4, 1]);

        // Union across tasks preserves the original ordered list
        let original: Vec<String> = split_games(&archive(2 * n + 1)).collect();
        assert_eq!(collected, original);
    }

    #[tokio::test]
    async fn test_rerun_enqueues_no_duplicates() {
        let (splitter, queue) = splitter_over(&archive(3), 1).await;

        let first = splitter.split_file(&event()).await.unwrap();
        assert_eq!(first.duplicates, 0);

        let second = splitter.split_file(&event()).await.unwrap();
        assert_eq!(second.duplicates, 3);
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_fails_with_no_side_effects() {
        let (splitter, queue) = splitter_over(&archive(1), 1).await;

        let missing = UploadEvent {
            bucket: "chessy-pgn-files".into(),
            object_key: "absent.pgn".into(),
        };
        assert!(splitter.split_file(&missing).await.is_err());
        assert!(queue.is_empty());
    }
}
