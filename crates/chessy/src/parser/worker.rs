//! The chunk worker: one leased chunk task in, record store writes out.
//!
//! Error classification drives everything here. A game that will not
//! parse is a permanent, data-level failure; it is recorded and never
//! retried. A record store error is transient; it propagates out so the
//! caller skips the ack and lets the queue's visibility timeout drive a
//! redelivery. Conflating the two either wastes retries on unparseable
//! data or drops data that a retry would have saved.

use chrono::Utc;
use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, warn};

use chessy_common::error::{StoreError, StoreSerializeSnafu};
use chessy_common::{RecordStoreRef, TableNames, emit};
use chessy_common::metrics::events::{GamesMalformed, GamesParsed};

use crate::error::GameParseError;
use crate::queue::ChunkTask;
use crate::records::{
    FailureRecord, GameFailure, GameRecord, SuccessMarker, chunk_failure_id, game_record_id,
};

use super::{ParsedGame, parse_game};

/// How a chunk delivery ended, from the queue's point of view.
///
/// Both variants mean "acknowledge the task": a permanent failure is just
/// as terminal as a success. Transient failures never reach this type;
/// they surface as `Err(StoreError)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDisposition {
    /// Every well-formed game was persisted.
    Success,
    /// Every game in the chunk was malformed; a chunk failure record was
    /// written instead.
    AllMalformed,
}

/// Processes chunk tasks against the record store.
pub struct ChunkWorker {
    store: RecordStoreRef,
    tables: TableNames,
}

impl ChunkWorker {
    pub fn new(store: RecordStoreRef, tables: TableNames) -> Self {
        Self { store, tables }
    }

    /// Process one delivered chunk task to completion.
    ///
    /// Every write is an upsert keyed by a deterministic id, so a crash
    /// partway through followed by redelivery rewrites the same keys.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for transient record store failures. The caller
    /// must NOT acknowledge the task in that case.
    pub async fn process(&self, task: &ChunkTask) -> Result<ChunkDisposition, StoreError> {
        let mut parsed: Vec<(u32, ParsedGame)> = Vec::new();
        let mut malformed: Vec<(u32, GameParseError)> = Vec::new();

        for (index, raw) in task.games.iter().enumerate() {
            let index = index as u32;
            match parse_game(raw) {
                Ok(game) => parsed.push((index, game)),
                Err(e) => malformed.push((index, e)),
            }
        }

        if parsed.is_empty() && !malformed.is_empty() {
            self.record_chunk_failure(task, &malformed).await?;
            return Ok(ChunkDisposition::AllMalformed);
        }

        for (index, game) in &parsed {
            self.persist_game(task, *index, game).await?;
        }
        for (index, error) in &malformed {
            warn!(
                file_id = %task.file_id,
                chunk_index = task.chunk_index,
                game_index = index,
                error = %error,
                "Skipping malformed game"
            );
            self.record_game_failure(task, *index, error).await?;
        }

        let marker = SuccessMarker::now(chunk_failure_id(&task.file_id, task.chunk_index));
        let marker_id = marker.id.clone();
        self.put(&self.tables.pgn_files_succeeded, &marker_id, &marker)
            .await?;

        emit!(GamesParsed {
            count: parsed.len() as u64,
            component: "parser",
        });
        if !malformed.is_empty() {
            emit!(GamesMalformed {
                count: malformed.len() as u64,
                component: "parser",
            });
        }
        debug!(
            file_id = %task.file_id,
            chunk_index = task.chunk_index,
            parsed = parsed.len(),
            malformed = malformed.len(),
            "Chunk processed"
        );

        Ok(ChunkDisposition::Success)
    }

    async fn persist_game(
        &self,
        task: &ChunkTask,
        index: u32,
        game: &ParsedGame,
    ) -> Result<(), StoreError> {
        let id = game_record_id(&task.file_id, task.chunk_index, index);
        let record = GameRecord {
            id: id.clone(),
            white: game.white.clone(),
            black: game.black.clone(),
            event: game.event.clone(),
            result: game.result.clone(),
            pgn_body: task.games[index as usize].clone(),
            source_file_id: task.file_id.clone(),
            source_chunk_index: task.chunk_index,
        };
        self.put(&self.tables.games, &id, &record).await?;

        let marker = SuccessMarker::now(id.clone());
        self.put(&self.tables.games_succeeded, &id, &marker).await
    }

    async fn record_game_failure(
        &self,
        task: &ChunkTask,
        index: u32,
        error: &GameParseError,
    ) -> Result<(), StoreError> {
        let id = game_record_id(&task.file_id, task.chunk_index, index);
        let failure = GameFailure {
            id: id.clone(),
            reason: error.to_string(),
            raw_game: task.games[index as usize].clone(),
            failed_at: Utc::now(),
        };
        self.put(&self.tables.games_failed, &id, &failure).await
    }

    /// Record a chunk whose games are all malformed.
    ///
    /// Writes the per-game audit entries, then one chunk-level failure
    /// record keyed by the deterministic chunk failure id.
    async fn record_chunk_failure(
        &self,
        task: &ChunkTask,
        malformed: &[(u32, GameParseError)],
    ) -> Result<(), StoreError> {
        for (index, error) in malformed {
            self.record_game_failure(task, *index, error).await?;
        }

        let id = chunk_failure_id(&task.file_id, task.chunk_index);
        let first = &malformed[0].1;
        let failure = FailureRecord {
            id: id.clone(),
            source_file_id: task.file_id.clone(),
            source_chunk_index: task.chunk_index,
            reason: format!("all {} games malformed; first error: {first}", malformed.len()),
            raw_payload: task.games.join("\n\n"),
            failed_at: Utc::now(),
        };
        self.put(&self.tables.pgn_files_failed, &id, &failure).await?;

        emit!(GamesMalformed {
            count: malformed.len() as u64,
            component: "parser",
        });
        warn!(
            file_id = %task.file_id,
            chunk_index = task.chunk_index,
            games = malformed.len(),
            "Recorded chunk failure: all games malformed"
        );
        Ok(())
    }

    async fn put<T: serde::Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let document: Value =
            serde_json::to_value(record).context(StoreSerializeSnafu { table, id })?;
        self.store.put(table, id, document).await
    }
}
