//! Worker configuration, with `Default` impls carrying the spec's literal
//! constants (batch size, tree depth, timeouts, retry ceilings).

use std::time::Duration;

/// Sequencer-wide tunables, shared by every worker through [`crate::Context`].
///
/// Loaded by the `production` binary from a TOML file plus env overrides;
/// this crate only defines the shape and its defaults, not the loading
/// mechanism (that thin wiring lives in the binary, per spec.md's
/// configuration-loading non-goal).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// `N`, the fixed number of ballots per aggregated batch.
    pub batch_size: usize,
    /// How long the Aggregator Worker waits since the first pending vote
    /// before flushing a partial (< `batch_size`) batch.
    pub aggregator_timeout: Duration,
    /// How often the Aggregator Worker checks a process's pending queue.
    pub aggregator_tick: Duration,
    /// Maximum proving attempts before a batch is quarantined.
    pub max_proof_attempts: u32,
    /// Maximum attempts for transient storage/network retries.
    pub max_retry_attempts: u32,
    /// Ceiling on the exponential backoff delay between retries.
    pub retry_backoff_ceiling: Duration,
    /// Initial delay for the first retry.
    pub retry_backoff_initial: Duration,
    /// How long a submitted transaction may sit pending before the
    /// Submission Manager bumps its fee and re-broadcasts.
    pub bump_timeout: Duration,
    /// Multiplier applied to fee caps on a fee bump.
    pub bump_multiplier: f64,
    /// How often the Process Monitor polls the L1 registry.
    pub monitor_poll_interval: Duration,
    /// Soft limit on a per-process in-memory vote queue before the
    /// configured backpressure policy engages.
    pub queue_soft_limit: usize,
    /// Backpressure behavior once a queue passes its soft limit.
    pub queue_backpressure: QueueBackpressure,
}

/// What a producer does once a queue passes [`SequencerConfig::queue_soft_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QueueBackpressure {
    /// Drop the new item and log a warning.
    DropNewest,
    /// Block the producer until the queue drains.
    Block,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            aggregator_timeout: Duration::from_secs(30),
            aggregator_tick: Duration::from_millis(500),
            max_proof_attempts: 3,
            max_retry_attempts: 5,
            retry_backoff_ceiling: Duration::from_secs(30),
            retry_backoff_initial: Duration::from_millis(200),
            bump_timeout: Duration::from_secs(60),
            bump_multiplier: 1.125,
            monitor_poll_interval: Duration::from_secs(12),
            queue_soft_limit: 4096,
            queue_backpressure: QueueBackpressure::DropNewest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_size_matches_spec_scenarios() {
        // spec.md scenario 1: "valid=1 + 7 dummies" implies N=8.
        assert_eq!(SequencerConfig::default().batch_size, 8);
    }

    #[test]
    fn serde_round_trips() {
        let config = SequencerConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let back: SequencerConfig = toml::from_str(&toml).unwrap();
        assert_eq!(back.batch_size, config.batch_size);
    }
}
