//! State-tree error kinds.

/// Errors raised while reading or mutating a [`crate::StateTree`].
#[derive(Debug, thiserror::Error)]
pub enum StateTreeError {
    /// The underlying storage transaction failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// A stored node's bytes did not decode to a valid 32-byte field element.
    #[error("corrupt tree node at {0}")]
    CorruptNode(String),

    /// Attempted to insert at a key that already holds a live leaf.
    #[error("key already occupied")]
    AlreadyOccupied,

    /// Attempted to update or remove a key that holds no live leaf.
    #[error("key not occupied")]
    NotOccupied,
}
