//! Thin TOML + env configuration loading for the `sequencer-node` binary.
//!
//! `sequencer_runtime::SequencerConfig` only defines the tunables' shape and
//! defaults; per its own doc comment, loading them from disk is this
//! binary's job.

use std::net::SocketAddr;
use std::path::PathBuf;

use sequencer_runtime::SequencerConfig;
use serde::Deserialize;

/// The binary's full configuration: where things live on disk, where the
/// health/metrics endpoint binds, and the shared worker tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// RocksDB data directory.
    pub data_dir: PathBuf,
    /// Path to the proving-artifact manifest (`sequencer_proving::Manifest`).
    pub manifest_path: PathBuf,
    /// Optional path to a KZG trusted-setup file. Without one, the node
    /// submits with `sequencer_submission::FixtureBlobCommitter` instead of
    /// a real `KzgContext` (see `SubmissionConfig::kzg_trusted_setup`).
    pub submission: SubmissionConfig,
    /// Optional genesis process snapshot (see [`crate::genesis`]).
    pub genesis_path: Option<PathBuf>,
    /// Address the health/metrics HTTP server binds to.
    pub metrics_addr: SocketAddr,
    /// Shared worker tunables (batch size, timeouts, retry ceilings).
    pub sequencer: SequencerConfig,
}

/// Submission-side wiring: the signer address, and the optional trusted
/// setup path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Hex-encoded 20-byte signer address (`submitStateTransition` caller).
    pub signer_address: String,
    /// Path to a KZG trusted-setup `.txt` file, if a real one is available.
    pub kzg_trusted_setup: Option<PathBuf>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            signer_address: "0".repeat(40),
            kzg_trusted_setup: None,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            manifest_path: PathBuf::from("./manifest.toml"),
            submission: SubmissionConfig::default(),
            genesis_path: None,
            metrics_addr: "0.0.0.0:9000".parse().unwrap(),
            sequencer: SequencerConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file, falling back to defaults for anything the
    /// file doesn't set; any `SEQUENCER_*` environment variable overrides
    /// the matching dotted TOML key (e.g. `SEQUENCER_METRICS_ADDR`).
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let mut config: NodeConfig = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
                toml::from_str(&text)
                    .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?
            }
            None => NodeConfig::default(),
        };

        if let Ok(addr) = std::env::var("SEQUENCER_METRICS_ADDR") {
            config.metrics_addr = addr.parse()?;
        }
        if let Ok(dir) = std::env::var("SEQUENCER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(signer) = std::env::var("SEQUENCER_SIGNER_ADDRESS") {
            config.submission.signer_address = signer;
        }
        Ok(config)
    }
}
