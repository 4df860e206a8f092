//! Proving-artifact and verification error kinds.

/// Errors raised while loading artifacts or verifying proofs.
#[derive(Debug, thiserror::Error)]
pub enum ProvingError {
    /// The manifest named a circuit artifact that could not be read from disk.
    #[error("failed to read artifact {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact's content hash did not match the manifest's recorded
    /// digest: it was swapped, corrupted, or never matched a trusted setup.
    #[error("artifact {path} content hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// The path whose contents were checked.
        path: String,
        /// The digest recorded in the manifest.
        expected: String,
        /// The digest actually computed.
        actual: String,
    },

    /// The artifact's bytes did not deserialize into the expected key type.
    #[error("malformed artifact {path}: {reason}")]
    Malformed {
        /// The path that failed to parse.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// The manifest has no entry for the requested circuit.
    #[error("no artifact registered for circuit {0:?}")]
    UnknownCircuit(crate::Circuit),

    /// The underlying proof system rejected the proof structurally (not the
    /// same as a successful verification returning `false`).
    #[error("proof system error: {0}")]
    ProofSystem(String),
}
