//! Construction of every worker and the tick loops that drive them.

use std::sync::Arc;
use std::time::Duration;

use sequencer_aggregator::AggregatorWorker;
use sequencer_intake::{BallotIntake, CompositeCensusVerifier, EcdsaVoteSignatureVerifier, VoteIntakeQueue};
use sequencer_monitor::{FixtureRegistryClient, ProcessMonitor, RegistryProcess};
use sequencer_proving::{ArtifactStore, FixtureProver, Prover};
use sequencer_results::{DecryptionKeyProvider, FixtureKeyProvider, ResultsWorker};
use sequencer_runtime::Context;
use sequencer_submission::{BlobCommitter, ChainClient, FixtureBlobCommitter, FixtureChainClient, SubmissionInbox, SubmissionManager};
use sequencer_transition::TransitionWorker;
use sequencer_types::Address;
use tokio_util::sync::CancellationToken;

use crate::known_process_ids;
use crate::metrics::Metrics;

/// Every worker this binary drives, holding the shared collaborators they
/// were constructed from.
pub struct Node {
    pub context: Context,
    pub monitor: Arc<ProcessMonitor>,
    pub intake: Arc<BallotIntake>,
    pub aggregator: Arc<AggregatorWorker>,
    pub transition: Arc<TransitionWorker>,
    pub results: Arc<ResultsWorker>,
    pub submission: Arc<SubmissionManager>,
}

impl Node {
    /// Build every worker from the loaded config, with fixture
    /// collaborators standing in for the out-of-scope chain/registry/
    /// proving/KZG bindings (see this crate's top-level doc comment).
    pub fn build(
        context: Context,
        artifacts: Arc<ArtifactStore>,
        genesis: Vec<RegistryProcess>,
        signer: Address,
        kzg: Option<Arc<dyn BlobCommitter>>,
    ) -> Self {
        let prover: Arc<dyn Prover> = Arc::new(FixtureProver);
        let registry: Arc<dyn sequencer_monitor::RegistryClient> = Arc::new(FixtureRegistryClient::new(genesis));
        let keys: Arc<dyn DecryptionKeyProvider> = Arc::new(FixtureKeyProvider::new(sequencer_crypto::Scalar::from(1u64)));
        let chain: Arc<dyn ChainClient> = Arc::new(FixtureChainClient::new(0, [0u8; 32]));
        let kzg = kzg.unwrap_or_else(|| Arc::new(FixtureBlobCommitter));

        let votes = Arc::new(VoteIntakeQueue::new());
        let ready = Arc::new(sequencer_aggregator::ReadyBatchQueue::new());
        let inbox = Arc::new(SubmissionInbox::new());

        let census = Arc::new(CompositeCensusVerifier::default());
        let signatures = Arc::new(EcdsaVoteSignatureVerifier);

        let monitor = Arc::new(ProcessMonitor::new(context.clone(), registry));
        let intake = Arc::new(BallotIntake::new(context.clone(), artifacts, census, signatures, votes.clone()));
        let aggregator = Arc::new(AggregatorWorker::new(context.clone(), prover.clone(), votes.clone(), ready.clone()));
        let transition =
            Arc::new(TransitionWorker::new(context.clone(), prover.clone(), ready, votes, inbox.clone()));
        let results = Arc::new(ResultsWorker::new(context.clone(), prover, keys, inbox.clone()));
        let submission = Arc::new(SubmissionManager::new(context.clone(), chain, kzg, signer, inbox));

        Self { context, monitor, intake, aggregator, transition, results, submission }
    }

    /// Spawn one tick loop per worker, all cancelled together when
    /// `self.context.cancellation` fires.
    pub fn spawn_loops(&self, metrics: Arc<Metrics>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        handles.push(tokio::spawn(run_monitor_loop(
            self.monitor.clone(),
            self.context.config.monitor_poll_interval,
            self.context.cancellation.clone(),
            metrics.clone(),
        )));

        handles.push(tokio::spawn(run_process_loop(
            "aggregator",
            self.context.storage.clone(),
            self.context.config.aggregator_tick,
            self.context.cancellation.clone(),
            metrics.clone(),
            {
                let worker = self.aggregator.clone();
                move |pid| {
                    let worker = worker.clone();
                    async move { worker.tick(pid).await.map(|_| ()).map_err(|e| e.to_string()) }
                }
            },
        )));

        handles.push(tokio::spawn(run_process_loop(
            "transition",
            self.context.storage.clone(),
            self.context.config.aggregator_tick,
            self.context.cancellation.clone(),
            metrics.clone(),
            {
                let worker = self.transition.clone();
                move |pid| {
                    let worker = worker.clone();
                    async move { worker.tick(pid).await.map(|_| ()).map_err(|e| e.to_string()) }
                }
            },
        )));

        handles.push(tokio::spawn(run_process_loop(
            "results",
            self.context.storage.clone(),
            self.context.config.monitor_poll_interval,
            self.context.cancellation.clone(),
            metrics.clone(),
            {
                let worker = self.results.clone();
                move |pid| {
                    let worker = worker.clone();
                    async move { worker.tick(pid).await.map(|_| ()).map_err(|e| e.to_string()) }
                }
            },
        )));

        handles.push(tokio::spawn(run_process_loop(
            "submission",
            self.context.storage.clone(),
            self.context.config.aggregator_tick,
            self.context.cancellation.clone(),
            metrics,
            {
                let worker = self.submission.clone();
                move |pid| {
                    let worker = worker.clone();
                    async move { worker.tick(pid).await.map(|_| ()).map_err(|e| e.to_string()) }
                }
            },
        )));

        handles
    }
}

async fn run_monitor_loop(
    monitor: Arc<ProcessMonitor>,
    interval: Duration,
    cancellation: CancellationToken,
    metrics: Arc<Metrics>,
) {
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        match monitor.tick().await {
            Ok(touched) => metrics.monitor_processes_synced.inc_by(touched as u64),
            Err(err) => {
                tracing::warn!(error = %err, "process monitor tick failed");
                metrics.tick_errors.with_label_values(&["monitor"]).inc();
            }
        }
    }
}

/// Drive one worker's `tick(process_id)` for every currently-known process,
/// once per `interval`, until `cancellation` fires.
async fn run_process_loop<F, Fut>(
    name: &'static str,
    storage: sequencer_storage::Storage,
    interval: Duration,
    cancellation: CancellationToken,
    metrics: Arc<Metrics>,
    tick: F,
) where
    F: Fn(sequencer_types::ProcessId) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
{
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        for process_id in known_process_ids(&storage) {
            if let Err(error) = tick(process_id).await {
                tracing::warn!(worker = name, ?process_id, %error, "worker tick failed");
                metrics.tick_errors.with_label_values(&[name]).inc();
            }
        }
    }
}
