//! `sequencer-node run`: boots every worker crate against one shared
//! `Context` and serves `/healthz` + `/metrics` until a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sequencer_production::config::NodeConfig;
use sequencer_production::metrics::Metrics;
use sequencer_production::wiring::Node;
use sequencer_production::{genesis, telemetry};
use sequencer_proving::ArtifactStore;
use sequencer_runtime::{Context, SystemClock};
use sequencer_storage::Storage;
use sequencer_submission::KzgContext;
use sequencer_types::Address;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "sequencer-node")]
#[command(about = "Sequencer core: runs the Process Monitor, Aggregator, State-Transition, Results, and Submission workers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sequencer core until interrupted.
    Run {
        /// Path to a TOML config file; defaults are used for anything it omits.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a config file (and its manifest/genesis references) without
    /// starting any worker loop.
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn decode_signer(hex_str: &str) -> anyhow::Result<Address> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    let bytes: [u8; 20] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("signer_address must be 20 bytes"))?;
    Ok(Address::from_bytes(bytes))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { config } => {
            let config = NodeConfig::load(config.as_deref())?;
            let _ = genesis::load(config.genesis_path.as_deref())?;
            let _ = ArtifactStore::load(&config.manifest_path)?;
            println!("config OK: {:#?}", config);
            Ok(())
        }

        Commands::Run { config } => {
            tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

            let config = NodeConfig::load(config.as_deref())?;
            tracing::info!(data_dir = %config.data_dir.display(), "starting sequencer-node");

            let storage = Storage::open(&config.data_dir)?;
            let cancellation = CancellationToken::new();
            let context = Context::new(storage, Arc::new(SystemClock), config.sequencer.clone(), cancellation.clone());

            let artifacts = Arc::new(ArtifactStore::load(&config.manifest_path)?);
            let genesis_processes = genesis::load(config.genesis_path.as_deref())?;
            let signer = decode_signer(&config.submission.signer_address)?;
            let kzg = match &config.submission.kzg_trusted_setup {
                Some(path) => Some(Arc::new(KzgContext::load(path)?) as Arc<dyn sequencer_submission::BlobCommitter>),
                None => None,
            };

            let node = Node::build(context, artifacts, genesis_processes, signer, kzg);
            let metrics = Arc::new(Metrics::new());
            let worker_handles = node.spawn_loops(metrics.clone());

            let telemetry_handle = tokio::spawn(telemetry::serve(
                config.metrics_addr,
                metrics.registry.clone(),
                cancellation.clone(),
            ));

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                }
                _ = cancellation.cancelled() => {}
            }
            cancellation.cancel();

            for handle in worker_handles {
                let _ = handle.await;
            }
            telemetry_handle.await??;
            Ok(())
        }
    }
}
