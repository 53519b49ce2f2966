//! Persisted record types and deterministic id derivation.
//!
//! Every write the pipeline makes is an upsert keyed by an id that is a
//! pure function of where the data came from. Redelivering a chunk
//! therefore rewrites the same keys instead of duplicating records; this
//! is what turns at-least-once delivery into exactly-once effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derive a file id from an object storage key.
///
/// Path separators are folded so the id stays object-key safe when the
/// record store persists one document per id.
pub fn derive_file_id(object_key: &str) -> String {
    object_key.replace('/', "_")
}

/// Id of the game at `game_index` within chunk `chunk_index` of a file.
///
/// Pure function of (file, chunk, position); stable across redeliveries
/// of the same chunk payload.
pub fn game_record_id(file_id: &str, chunk_index: u32, game_index: u32) -> String {
    format!("{file_id}-{chunk_index:04}-{game_index:04}")
}

/// Id of the chunk-level failure record for a chunk.
pub fn chunk_failure_id(file_id: &str, chunk_index: u32) -> String {
    format!("{file_id}-{chunk_index:04}")
}

/// A successfully parsed game, as persisted to the games table.
///
/// Field names match the table contract the read API projects
/// (`id`, `White`, `Black`, `Event`, `Result`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    pub id: String,
    #[serde(rename = "White")]
    pub white: String,
    #[serde(rename = "Black")]
    pub black: String,
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "pgnBody")]
    pub pgn_body: String,
    #[serde(rename = "sourceFileId")]
    pub source_file_id: String,
    #[serde(rename = "sourceChunkIndex")]
    pub source_chunk_index: u32,
}

/// A chunk-level failure, persisted to the pgn-files-failed table.
///
/// Written either by the parser (whole chunk malformed) or by the
/// dead-letter handler (retries exhausted). The deterministic id makes
/// re-recording the same failure an overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: String,
    #[serde(rename = "sourceFileId")]
    pub source_file_id: String,
    #[serde(rename = "sourceChunkIndex")]
    pub source_chunk_index: u32,
    pub reason: String,
    #[serde(rename = "rawPayload")]
    pub raw_payload: String,
    #[serde(rename = "failedAt")]
    pub failed_at: DateTime<Utc>,
}

/// Per-game failure entry for the games-failed audit table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameFailure {
    pub id: String,
    pub reason: String,
    #[serde(rename = "rawGame")]
    pub raw_game: String,
    #[serde(rename = "failedAt")]
    pub failed_at: DateTime<Utc>,
}

/// Success marker for the meta tables (games-succeeded,
/// pgn-files-succeeded). Auditability only; correctness never reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessMarker {
    pub id: String,
    #[serde(rename = "recordedAt")]
    pub recorded_at: DateTime<Utc>,
}

impl SuccessMarker {
    pub fn now(id: String) -> Self {
        Self {
            id,
            recorded_at: Utc::now(),
        }
    }
}
