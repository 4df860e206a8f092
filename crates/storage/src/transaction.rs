//! Optimistic-concurrency transaction wrapper.
//!
//! Every read goes through `get_for_update`, which registers the key with
//! RocksDB's optimistic-transaction conflict tracker: if another transaction
//! writes to that key before this one commits, `commit()` fails with
//! [`StorageError::Conflict`] and the caller is expected to retry the whole
//! transaction body (see `sequencer_runtime::retry`).
//!
//! Deletes are tombstones, not literal RocksDB deletes, so that
//! [`Transaction::iter_prefix`] can tell "never written" apart from
//! "written, then removed" when a transition touches the same key twice.

use crate::error::StorageError;
use rocksdb::{Direction, ErrorKind, IteratorMode, OptimisticTransactionDB};

const TOMBSTONE: u8 = 0;
const PRESENT: u8 = 1;

fn tag(value: Vec<u8>) -> Vec<u8> {
    let mut tagged = Vec::with_capacity(value.len() + 1);
    tagged.push(PRESENT);
    tagged.extend(value);
    tagged
}

fn untag(raw: Vec<u8>) -> Option<Vec<u8>> {
    match raw.split_first() {
        Some((&PRESENT, rest)) => Some(rest.to_vec()),
        _ => None,
    }
}

/// A single optimistic transaction against a [`crate::Storage`] instance.
pub struct Transaction<'a> {
    pub(crate) inner: rocksdb::Transaction<'a, OptimisticTransactionDB>,
}

impl<'a> Transaction<'a> {
    /// Read a key, registering it for conflict detection.
    ///
    /// Returns `Ok(None)` for both a never-written key and a tombstoned one.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let raw = self.inner.get_for_update(key, true)?;
        Ok(raw.and_then(untag))
    }

    /// Write a key unconditionally.
    pub fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        self.inner.put(key, tag(value))?;
        Ok(())
    }

    /// Tombstone a key. A subsequent `get` on the same key returns `None`.
    pub fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.inner.put(key, [TOMBSTONE])?;
        Ok(())
    }

    /// Collect every live (non-tombstoned) entry whose key starts with
    /// `prefix`, in ascending key order.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut out = Vec::new();
        let iter = self
            .inner
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, raw) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(value) = untag(raw.to_vec()) {
                out.push((key.to_vec(), value));
            }
        }
        Ok(out)
    }

    /// Commit the transaction. Fails with [`StorageError::Conflict`] if a
    /// registered read was invalidated by a concurrent writer.
    pub fn commit(self) -> Result<(), StorageError> {
        self.inner.commit().map_err(classify_commit_error)
    }

    /// Discard the transaction without applying its writes.
    pub fn rollback(self) -> Result<(), StorageError> {
        self.inner.rollback()?;
        Ok(())
    }
}

fn classify_commit_error(err: rocksdb::Error) -> StorageError {
    match err.kind() {
        ErrorKind::Busy | ErrorKind::TryAgain | ErrorKind::TimedOut => StorageError::Conflict,
        _ => StorageError::Engine(err.to_string()),
    }
}
