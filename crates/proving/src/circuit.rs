//! Identifiers for the protocol's fixed circuits.
//!
//! The circuits themselves (their constraint systems, trusted setups, and
//! the ballot-proof and recursive-aggregation logic) are collaborators
//! this crate never builds; it only loads their verifying keys and checks
//! proofs against them.

use serde::{Deserialize, Serialize};

/// One of the protocol's fixed circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Circuit {
    /// The client-side ballot proof voters attach to their submission.
    Ballot,
    /// The recursive circuit aggregating `BatchSize` ballot proofs into one.
    Aggregation,
    /// The circuit proving correct application of a batch to the state tree.
    StateTransition,
    /// The circuit proving correct tally decryption.
    Results,
}
