//! The L1 process registry, injected rather than implemented here.
//!
//! spec.md §6 lists the registry's read side as `getProcess(processID) ->
//! Process`; discovering *which* IDs exist (and noticing a status change
//! such as `Ended`) additionally requires either an event subscription or
//! a listing call the real contract binding supplies. Both are collapsed
//! into one collaborator trait, mirroring `sequencer_proving::Prover`'s
//! shape: the chain client itself is out of scope, only the contract this
//! crate needs from it.

use async_trait::async_trait;
use sequencer_crypto::Point;
use sequencer_types::{Address, BallotMode, CensusDescriptor, ProcessId, ProcessStatus};
use std::sync::Mutex;

use crate::error::MonitorError;

/// A process as currently recorded on the L1 registry.
#[derive(Debug, Clone)]
pub struct RegistryProcess {
    /// The process's identifier.
    pub id: ProcessId,
    /// The organizer's address.
    pub organizer: Address,
    /// The process's current on-chain lifecycle status.
    pub status: ProcessStatus,
    /// Ballot admissibility constants.
    pub ballot_mode: BallotMode,
    /// ElGamal public key for this process.
    pub encryption_key: Point,
    /// Voter-set descriptor.
    pub census: CensusDescriptor,
}

/// Read access to the L1 process registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Every process the registry currently knows about, in the form the
    /// Process Monitor needs to detect new processes and status changes.
    async fn list_processes(&self) -> Result<Vec<RegistryProcess>, MonitorError>;
}

/// An in-memory registry stand-in for tests and local development: holds a
/// snapshot that can be replaced between polls to simulate new processes
/// appearing or a process's status changing on-chain.
#[derive(Default)]
pub struct FixtureRegistryClient {
    processes: Mutex<Vec<RegistryProcess>>,
}

impl FixtureRegistryClient {
    /// Start with a fixed snapshot of processes.
    pub fn new(processes: Vec<RegistryProcess>) -> Self {
        Self { processes: Mutex::new(processes) }
    }

    /// Replace the snapshot a subsequent `list_processes` call returns.
    pub fn set(&self, processes: Vec<RegistryProcess>) {
        *self.processes.lock().expect("fixture registry mutex poisoned") = processes;
    }
}

#[async_trait]
impl RegistryClient for FixtureRegistryClient {
    async fn list_processes(&self) -> Result<Vec<RegistryProcess>, MonitorError> {
        Ok(self.processes.lock().expect("fixture registry mutex poisoned").clone())
    }
}
