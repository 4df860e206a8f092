//! Optional dev/demo process seeding for `sequencer_monitor::FixtureRegistryClient`.
//!
//! spec.md's Non-goals exclude the census-building service and the L1
//! registry itself; `RegistryClient` is the collaborator this binary is
//! handed a real implementation of in production. Absent one, a genesis
//! TOML file lets the node boot with a fixed set of processes for local
//! development, mirroring the teacher's spammer genesis-TOML pattern
//! (`crates/spammer/src/genesis/mod.rs::generate_genesis_toml`).

use std::path::Path;

use ark_ec::{AffineRepr, CurveGroup};
use sequencer_crypto::{Point, Scalar};
use sequencer_monitor::RegistryProcess;
use sequencer_types::{Address, BallotMode, CensusDescriptor, CensusOrigin, ProcessId, ProcessStatus};
use serde::Deserialize;

/// One process in a genesis snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisProcess {
    /// Hex-encoded 32-byte process ID.
    pub process_id: String,
    /// Hex-encoded 20-byte organizer address.
    pub organizer: String,
    /// Hex-encoded scalar decryption key; the matching `encryption_key`
    /// point is derived from it here, same as a real CSP's keygen step.
    pub decryption_key: String,
    pub ballot_mode: BallotMode,
    /// Hex-encoded 32-byte census root.
    pub census_root: String,
    pub max_voters: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GenesisFile {
    #[serde(default)]
    pub processes: Vec<GenesisProcess>,
}

fn decode_32(hex_str: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 32 bytes, got different length"))
}

fn decode_20(hex_str: &str) -> anyhow::Result<[u8; 20]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 20 bytes, got different length"))
}

impl GenesisProcess {
    fn into_registry_process(self) -> anyhow::Result<RegistryProcess> {
        let key_bytes = decode_32(&self.decryption_key)?;
        let secret = Scalar::from(u64::from_be_bytes(key_bytes[24..32].try_into().unwrap()));
        let encryption_key: Point = (Point::generator() * secret).into_affine();

        Ok(RegistryProcess {
            id: ProcessId::from_bytes(decode_32(&self.process_id)?),
            organizer: Address::from_bytes(decode_20(&self.organizer)?),
            status: ProcessStatus::Ready,
            ballot_mode: self.ballot_mode,
            encryption_key,
            census: CensusDescriptor {
                origin: CensusOrigin::Merkle,
                root: decode_32(&self.census_root)?,
                uri: None,
                max_voters: self.max_voters,
            },
        })
    }
}

/// Load a genesis TOML file into a list of [`RegistryProcess`]es, or return
/// an empty list if `path` is `None`.
pub fn load(path: Option<&Path>) -> anyhow::Result<Vec<RegistryProcess>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading genesis file {}: {e}", path.display()))?;
    let file: GenesisFile = toml::from_str(&text)
        .map_err(|e| anyhow::anyhow!("parsing genesis file {}: {e}", path.display()))?;
    file.processes.into_iter().map(GenesisProcess::into_registry_process).collect()
}
