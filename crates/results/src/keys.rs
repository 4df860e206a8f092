//! The process decryption key, injected rather than held by this crate.
//!
//! spec.md §4.7 treats the private key matching a process's `encryption_key`
//! as held off-line in production (the organizer, or a threshold of
//! trustees); this worker is only ever handed the key at the moment it
//! needs it, through the same async-trait collaborator shape
//! [`sequencer_proving::Prover`] uses for the circuits it doesn't own.

use async_trait::async_trait;
use sequencer_crypto::Scalar;
use sequencer_types::ProcessId;

use crate::error::ResultsError;

/// Supplies the private scalar matching a process's `encryption_key`.
#[async_trait]
pub trait DecryptionKeyProvider: Send + Sync {
    /// Fetch the secret key for `process_id`.
    async fn secret_key(&self, process_id: ProcessId) -> Result<Scalar, ResultsError>;
}

/// A fixed-key stand-in for tests and local development.
#[derive(Debug, Clone, Copy)]
pub struct FixtureKeyProvider {
    key: Scalar,
}

impl FixtureKeyProvider {
    /// Always hand back `key`, regardless of which process is asked for.
    pub fn new(key: Scalar) -> Self {
        Self { key }
    }
}

#[async_trait]
impl DecryptionKeyProvider for FixtureKeyProvider {
    async fn secret_key(&self, _process_id: ProcessId) -> Result<Scalar, ResultsError> {
        Ok(self.key)
    }
}
