//! Chunk task wire format.

use serde::{Deserialize, Serialize};

/// One bounded-size unit of queued work: a group of raw game texts cut
/// from a single archive file.
///
/// The payload is immutable once enqueued; game order within `games` is
/// what makes per-game id derivation stable across redeliveries. The
/// delivery count is queue metadata, not part of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkTask {
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "chunkIndex")]
    pub chunk_index: u32,
    pub games: Vec<String>,
}

impl ChunkTask {
    /// Identity of this chunk within its source file.
    ///
    /// Enqueue dedupe and failure-record ids both key off this pair.
    pub fn key(&self) -> (String, u32) {
        (self.file_id.clone(), self.chunk_index)
    }
}
