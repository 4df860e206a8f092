//! Authenticated sparse Merkle tree holding each process's voter ballots
//! and running encrypted accumulators.
//!
//! The tree is a pure commitment structure: it stores node hashes only, and
//! callers (the Ballot Intake census check, the State-Transition Worker)
//! supply the leaf's key/value whenever a proof is needed. This mirrors how
//! the fixed state-transition circuit consumes it: `key` and `value` are
//! circuit public inputs, not tree-resident state.

mod error;
mod key;
mod proof;
mod tree;

pub use error::StateTreeError;
pub use key::{ReservedKind, StateKey};
pub use proof::{verify_inclusion, verify_transition, InclusionProof, Operation, TransitionProof};
pub use tree::{empty_leaf_hash, leaf_hash, StateTree, MAX_LEVELS};
