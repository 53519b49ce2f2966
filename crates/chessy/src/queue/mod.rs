//! Lease-with-timeout work queue with a dead-letter queue.
//!
//! Models at-least-once, visibility-timeout delivery explicitly instead of
//! assuming a managed queue: a received task is leased until a deadline;
//! if not acknowledged before the deadline it becomes receivable again and
//! its delivery count increments. Once a task has been delivered
//! `max_receive_count + 1` times without an ack, the next expiry redrives
//! it to the dead-letter queue, which is terminal for the parser.
//!
//! Enqueue is idempotent per `(file_id, chunk_index)`: re-running the
//! splitter over a file after a partial failure re-offers the same chunks
//! and the duplicates are dropped here.

mod task;

pub use task::ChunkTask;

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use chessy_common::emit;
use chessy_common::metrics::events::{ChunkDeadLettered, QueueDepth};

/// Default visibility timeout for received tasks.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of redeliveries before a task is dead-lettered
/// (2 additional attempts, 3 total deliveries).
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 2;

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkQueueConfig {
    /// Lease duration during which a received task is hidden.
    pub visibility_timeout: Duration,
    /// Redeliveries allowed beyond the first delivery.
    pub max_receive_count: u32,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_receive_count: DEFAULT_MAX_RECEIVE_COUNT,
        }
    }
}

/// A received task plus the lease that must be acknowledged.
///
/// Dropping a lease without acking is the "transient failure" signal: the
/// deadline passes and the queue redelivers.
#[derive(Debug)]
pub struct Lease {
    pub task: ChunkTask,
    /// How many times this task has been delivered, this one included.
    pub delivery_count: u32,
    receipt: u64,
}

#[derive(Debug)]
struct LeaseState {
    receipt: u64,
    deadline: Instant,
}

#[derive(Debug)]
struct Entry {
    task: ChunkTask,
    delivery_count: u32,
    lease: Option<LeaseState>,
}

impl Entry {
    fn new(task: ChunkTask) -> Self {
        Self {
            task,
            delivery_count: 0,
            lease: None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    work: Vec<Entry>,
    dead: Vec<Entry>,
    enqueued_keys: HashSet<(String, u32)>,
    next_receipt: u64,
}

impl Shared {
    fn issue_receipt(&mut self) -> u64 {
        self.next_receipt += 1;
        self.next_receipt
    }
}

/// The shared work queue handle.
///
/// Cheap to share behind an `Arc`; every method takes `&self`. Workers
/// poll `receive()`; the dead-letter handler polls `receive_dead()`.
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<Shared>,
    config: WorkQueueConfig,
}

impl WorkQueue {
    pub fn new(config: WorkQueueConfig) -> Self {
        Self {
            state: Mutex::new(Shared::default()),
            config,
        }
    }

    /// Offer a chunk task to the queue.
    ///
    /// Returns `false` if a task with the same `(file_id, chunk_index)`
    /// was already enqueued on this queue (idempotent enqueue).
    pub fn enqueue(&self, task: ChunkTask) -> bool {
        let mut state = self.lock();
        if !state.enqueued_keys.insert(task.key()) {
            debug!(
                file_id = %task.file_id,
                chunk_index = task.chunk_index,
                "Dropping duplicate chunk enqueue"
            );
            return false;
        }
        state.work.push(Entry::new(task));
        emit!(QueueDepth {
            depth: state.work.len(),
            queue: "work",
        });
        true
    }

    /// Receive the next available task, if any.
    ///
    /// Reclaims expired leases first: each reclaim either makes the task
    /// receivable again or, once its delivery budget is spent, redrives it
    /// to the dead-letter queue.
    pub fn receive(&self) -> Option<Lease> {
        let now = Instant::now();
        let mut state = self.lock();
        self.sweep_expired(&mut state, now);

        let receipt = state.issue_receipt();
        let deadline = now + self.config.visibility_timeout;
        let entry = state.work.iter_mut().find(|e| e.lease.is_none())?;

        entry.delivery_count += 1;
        entry.lease = Some(LeaseState { receipt, deadline });

        Some(Lease {
            task: entry.task.clone(),
            delivery_count: entry.delivery_count,
            receipt,
        })
    }

    /// Acknowledge a task, deleting it from the queue.
    ///
    /// Returns `false` for a stale receipt (the lease already expired and
    /// the task was redelivered or redriven); the caller must then treat
    /// its work as superseded, which is safe because every write it made
    /// was an idempotent upsert.
    pub fn ack(&self, lease: &Lease) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        let acked = remove_leased(&mut state.work, lease.receipt, now);
        if acked {
            emit!(QueueDepth {
                depth: state.work.len(),
                queue: "work",
            });
        }
        acked
    }

    /// Receive the next available dead-lettered task, if any.
    ///
    /// The dead-letter queue has the same lease semantics (so its consumer
    /// can crash safely) but no further redrive: an expired lease simply
    /// makes the task receivable again.
    pub fn receive_dead(&self) -> Option<Lease> {
        let now = Instant::now();
        let mut state = self.lock();

        for entry in state.dead.iter_mut() {
            if let Some(lease) = &entry.lease
                && lease.deadline <= now
            {
                entry.lease = None;
            }
        }

        let receipt = state.issue_receipt();
        let deadline = now + self.config.visibility_timeout;
        let entry = state.dead.iter_mut().find(|e| e.lease.is_none())?;

        entry.delivery_count += 1;
        entry.lease = Some(LeaseState { receipt, deadline });

        Some(Lease {
            task: entry.task.clone(),
            delivery_count: entry.delivery_count,
            receipt,
        })
    }

    /// Acknowledge a dead-lettered task, removing it permanently.
    pub fn ack_dead(&self, lease: &Lease) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        let acked = remove_leased(&mut state.dead, lease.receipt, now);
        if acked {
            emit!(QueueDepth {
                depth: state.dead.len(),
                queue: "dead",
            });
        }
        acked
    }

    /// Number of tasks on the work queue (leased or not).
    pub fn len(&self) -> usize {
        self.lock().work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks on the dead-letter queue.
    pub fn dead_len(&self) -> usize {
        self.lock().dead.len()
    }

    /// True when both queues are fully drained.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.work.is_empty() && state.dead.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.state.lock().expect("work queue lock poisoned")
    }

    /// Reclaim expired work leases, redriving exhausted tasks.
    fn sweep_expired(&self, state: &mut Shared, now: Instant) {
        let budget = self.config.max_receive_count + 1;
        let mut index = 0;
        while index < state.work.len() {
            let expired = state.work[index]
                .lease
                .as_ref()
                .is_some_and(|l| l.deadline <= now);

            if !expired {
                index += 1;
                continue;
            }

            if state.work[index].delivery_count >= budget {
                let mut entry = state.work.remove(index);
                debug!(
                    file_id = %entry.task.file_id,
                    chunk_index = entry.task.chunk_index,
                    delivery_count = entry.delivery_count,
                    "Delivery budget exhausted, moving task to dead-letter queue"
                );
                emit!(ChunkDeadLettered { component: "queue" });
                entry.lease = None;
                state.dead.push(entry);
                emit!(QueueDepth {
                    depth: state.dead.len(),
                    queue: "dead",
                });
            } else {
                state.work[index].lease = None;
                index += 1;
            }
        }
    }
}

/// Remove the entry holding `receipt` if its lease is still live.
fn remove_leased(entries: &mut Vec<Entry>, receipt: u64, now: Instant) -> bool {
    let position = entries.iter().position(|e| {
        e.lease
            .as_ref()
            .is_some_and(|l| l.receipt == receipt && l.deadline > now)
    });
    match position {
        Some(index) => {
            entries.remove(index);
            true
        }
        None => false,
    }
}
