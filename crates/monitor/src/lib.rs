//! Process Monitor: discovers voting processes from the L1 registry and
//! idempotently initializes their state.

mod error;
mod registry;
mod worker;

pub use error::MonitorError;
pub use registry::{FixtureRegistryClient, RegistryClient, RegistryProcess};
pub use worker::ProcessMonitor;
