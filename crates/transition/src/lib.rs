//! State-Transition Worker: applies aggregated batches to the state tree
//! and proves correctness.

mod error;
mod worker;

pub use error::TransitionError;
pub use worker::TransitionWorker;
