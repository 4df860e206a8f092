//! Aggregator Worker: assembles batches of verified votes into one
//! recursive proof per batch, per spec.md §4.4.

mod error;
mod ready_queue;
mod worker;

pub use error::AggregatorError;
pub use ready_queue::ReadyBatchQueue;
pub use worker::AggregatorWorker;
