//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the pipeline.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! Prometheus metric. Events carry a `component` label so the splitter,
//! parser workers, and dead-letter handler can be observed separately.

use metrics::{counter, gauge};
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when an archive file has been split into chunk tasks.
pub struct FileSplit {
    pub chunks: u64,
    pub games: u64,
    pub component: &'static str,
}

impl InternalEvent for FileSplit {
    fn emit(self) {
        trace!(chunks = self.chunks, games = self.games, "File split");
        counter!("chessy_files_split_total", "component" => self.component).increment(1);
        counter!("chessy_chunks_enqueued_total", "component" => self.component)
            .increment(self.chunks);
    }
}

/// Event emitted when games are parsed successfully.
pub struct GamesParsed {
    pub count: u64,
    pub component: &'static str,
}

impl InternalEvent for GamesParsed {
    fn emit(self) {
        trace!(count = self.count, "Games parsed");
        counter!("chessy_games_parsed_total", "component" => self.component).increment(self.count);
    }
}

/// Event emitted when a game fails to parse (permanent, data-level).
pub struct GamesMalformed {
    pub count: u64,
    pub component: &'static str,
}

impl InternalEvent for GamesMalformed {
    fn emit(self) {
        trace!(count = self.count, "Games malformed");
        counter!("chessy_games_malformed_total", "component" => self.component)
            .increment(self.count);
    }
}

/// Outcome of one chunk task delivery.
#[derive(Debug, Clone, Copy)]
pub enum ChunkOutcome {
    /// Acknowledged after persisting every well-formed game.
    Success,
    /// Acknowledged with a chunk-level failure record (malformed input).
    PermanentFailure,
    /// Not acknowledged; the queue will redeliver.
    Retried,
}

impl ChunkOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkOutcome::Success => "success",
            ChunkOutcome::PermanentFailure => "permanent_failure",
            ChunkOutcome::Retried => "retried",
        }
    }
}

/// Event emitted when a chunk task delivery completes.
pub struct ChunkProcessed {
    pub outcome: ChunkOutcome,
    pub component: &'static str,
}

impl InternalEvent for ChunkProcessed {
    fn emit(self) {
        trace!(outcome = self.outcome.as_str(), "Chunk processed");
        counter!(
            "chessy_chunks_processed_total",
            "outcome" => self.outcome.as_str(),
            "component" => self.component
        )
        .increment(1);
    }
}

/// Event emitted when a chunk exhausts its delivery budget.
pub struct ChunkDeadLettered {
    pub component: &'static str,
}

impl InternalEvent for ChunkDeadLettered {
    fn emit(self) {
        trace!("Chunk dead-lettered");
        counter!("chessy_chunks_dead_lettered_total", "component" => self.component).increment(1);
    }
}

/// Event emitted to track the number of tasks waiting in a queue.
pub struct QueueDepth {
    pub depth: usize,
    pub queue: &'static str,
}

impl InternalEvent for QueueDepth {
    fn emit(self) {
        gauge!("chessy_queue_depth", "queue" => self.queue).set(self.depth as f64);
    }
}
