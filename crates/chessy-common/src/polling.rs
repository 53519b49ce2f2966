//! Generic polling loop trait and runner.
//!
//! The ingest side of the pipeline is poll-driven: each iteration lists the
//! archive location, prepares any newly arrived work, and processes it. The
//! loop sleeps between iterations and exits promptly on shutdown.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of a single processing iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationResult {
    /// Items were processed.
    ProcessedItems,
    /// No items were available to process.
    NoItems,
    /// Shutdown was requested mid-iteration.
    Shutdown,
}

/// Trait for implementing a polling-based processor.
#[async_trait]
pub trait PollingProcessor {
    /// The state type prepared for each iteration.
    type State: Send;
    /// The error type for this processor.
    type Error: std::error::Error + Send;

    /// Prepare state for a processing iteration.
    ///
    /// Returns `None` if there is no work to do this iteration.
    async fn prepare(&mut self) -> Result<Option<Self::State>, Self::Error>;

    /// Process the prepared state.
    async fn process(&mut self, state: Self::State) -> Result<IterationResult, Self::Error>;
}

/// Run a polling loop with the given processor until shutdown.
///
/// Each iteration calls `prepare()`, then `process()` if there is work,
/// then waits for the poll interval or the shutdown signal, whichever
/// comes first.
pub async fn run_polling_loop<P: PollingProcessor>(
    processor: &mut P,
    poll_interval: Duration,
    shutdown: CancellationToken,
    name: &str,
) -> Result<(), P::Error> {
    loop {
        let state = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(target = name, "Shutdown requested during preparation");
                return Ok(());
            }

            result = processor.prepare() => result?,
        };

        let result = match state {
            Some(s) => processor.process(s).await?,
            None => IterationResult::NoItems,
        };

        match result {
            IterationResult::Shutdown => break,
            IterationResult::NoItems => {
                debug!(
                    target = name,
                    "No new items, waiting {}s before next poll",
                    poll_interval.as_secs()
                );
            }
            IterationResult::ProcessedItems => {
                info!(
                    target = name,
                    "Iteration complete, waiting {}s before next poll",
                    poll_interval.as_secs()
                );
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(target = name, "Shutdown requested during poll wait");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    Ok(())
}
