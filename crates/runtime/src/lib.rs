//! Shared plumbing every worker crate depends on: the injected `Context`,
//! configuration defaults, the bounded-backoff `retry` helper, the
//! sequencer-wide error taxonomy, and the injectable clock.
//!
//! Deliberately thin: this crate owns no business logic, only the ambient
//! concerns spec.md's Design Notes call out as cross-cutting.

mod clock;
mod config;
mod context;
mod error;
pub mod retry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{QueueBackpressure, SequencerConfig};
pub use context::Context;
pub use error::{Classification, ErrorKind};
pub use retry::{RetryError, RetryPolicy};
