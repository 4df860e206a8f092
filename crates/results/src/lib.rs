//! Results Worker: decrypts a process's final accumulators and proves the
//! decryption correct once it has stopped accepting ballots.

mod error;
mod keys;
mod worker;

pub use error::ResultsError;
pub use keys::{DecryptionKeyProvider, FixtureKeyProvider};
pub use worker::ResultsWorker;
