//! The shared, injected context every worker is constructed from.
//!
//! Per spec.md's Design Notes: "Avoid global mutable state, inject a
//! context (clock, storage handle, chain client, signer) into each worker
//! at startup." Workers hold an owned `Context` (or a narrower view built
//! from one); there is no ambient/global state anywhere in this workspace.

use crate::clock::Clock;
use crate::config::SequencerConfig;
use sequencer_storage::Storage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared dependencies every worker needs: storage, time, configuration,
/// and the cancellation token that cascades a shutdown signal to every
/// descendant task.
#[derive(Clone)]
pub struct Context {
    /// The shared storage handle.
    pub storage: Storage,
    /// The injected clock.
    pub clock: Arc<dyn Clock>,
    /// Sequencer-wide tunables.
    pub config: Arc<SequencerConfig>,
    /// Cancelled on shutdown; every suspension point observes this.
    pub cancellation: CancellationToken,
}

impl Context {
    /// Build a context from its parts.
    pub fn new(
        storage: Storage,
        clock: Arc<dyn Clock>,
        config: SequencerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            storage,
            clock,
            config: Arc::new(config),
            cancellation,
        }
    }

    /// A child cancellation token scoped to one worker, so a worker can be
    /// torn down independently without cancelling its siblings, while still
    /// being cancelled when the parent (process-wide shutdown) fires.
    pub fn child_cancellation(&self) -> CancellationToken {
        self.cancellation.child_token()
    }
}
