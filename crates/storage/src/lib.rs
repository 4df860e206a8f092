//! Optimistic-concurrency key-value persistence for the sequencer.
//!
//! Every worker shares one [`Storage`] handle backed by a single RocksDB
//! `OptimisticTransactionDB`. Workers that touch disjoint key prefixes never
//! conflict; workers racing on the same process (which should not happen
//! under the per-process lease each pipeline stage holds, but is defended
//! against anyway) retry through [`StorageError::Conflict`].

pub mod codec;
mod error;
pub mod schema;
mod transaction;

pub use codec::{decode, encode};
pub use error::StorageError;
pub use transaction::Transaction;

use rocksdb::{OptimisticTransactionDB, Options};
use std::path::Path;
use std::sync::Arc;

/// A handle to the on-disk key-value store.
#[derive(Clone)]
pub struct Storage {
    db: Arc<OptimisticTransactionDB>,
}

impl Storage {
    /// Open (creating if absent) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let db = OptimisticTransactionDB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Start a new optimistic transaction.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            inner: self.db.transaction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::{Address, ProcessId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        n: u64,
    }

    #[test]
    fn schema_keys_round_trip_through_a_real_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let process_id = ProcessId::from_bytes([9u8; 32]);
        let voter = Address::from_bytes([1u8; 20]);
        let key = schema::vote_key(&process_id, &voter, sequencer_types::Sequence(3));

        let txn = storage.begin();
        txn.put(&key, encode(&Dummy { n: 77 }).unwrap()).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin();
        let raw = txn.get(&key).unwrap().expect("value present");
        let value: Dummy = decode(&raw).unwrap();
        assert_eq!(value, Dummy { n: 77 });
    }
}
