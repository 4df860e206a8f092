//! Per-process FIFO of batch numbers ready for the State-Transition Worker.
//!
//! Mirrors `sequencer_intake::VoteIntakeQueue`'s per-process `DashMap`
//! shape: cross-worker handoff happens through an in-memory queue, not a
//! shared mutable field, per spec.md §5's "message queues" guidance.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use sequencer_types::ProcessId;

/// Batch numbers a process's aggregated batches have been assigned, in the
/// order the State-Transition Worker must apply them.
#[derive(Default)]
pub struct ReadyBatchQueue {
    queues: DashMap<ProcessId, Mutex<VecDeque<u64>>>,
}

impl ReadyBatchQueue {
    /// An empty queue registry.
    pub fn new() -> Self {
        Self { queues: DashMap::new() }
    }

    /// Enqueue `batch_num` as ready for `process_id`.
    pub fn push(&self, process_id: ProcessId, batch_num: u64) {
        self.queues
            .entry(process_id)
            .or_insert_with(|| Mutex::new(VecDeque::new()))
            .lock()
            .expect("ready batch queue mutex poisoned")
            .push_back(batch_num);
    }

    /// Pop the oldest ready batch number for `process_id`, if any.
    pub fn pop(&self, process_id: ProcessId) -> Option<u64> {
        let entry = self.queues.get(&process_id)?;
        entry.lock().expect("ready batch queue mutex poisoned").pop_front()
    }

    /// Number of batches currently queued for `process_id`.
    pub fn len(&self, process_id: ProcessId) -> usize {
        self.queues
            .get(&process_id)
            .map(|q| q.lock().expect("ready batch queue mutex poisoned").len())
            .unwrap_or(0)
    }

    /// Whether `process_id` has no ready batches.
    pub fn is_empty(&self, process_id: ProcessId) -> bool {
        self.len(process_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_fifo_order() {
        let queue = ReadyBatchQueue::new();
        let process_id = ProcessId::from_bytes([1u8; 32]);
        queue.push(process_id, 0);
        queue.push(process_id, 1);
        queue.push(process_id, 2);

        assert_eq!(queue.pop(process_id), Some(0));
        assert_eq!(queue.pop(process_id), Some(1));
        assert_eq!(queue.len(process_id), 1);
    }

    #[test]
    fn unknown_process_is_empty() {
        let queue = ReadyBatchQueue::new();
        let process_id = ProcessId::from_bytes([9u8; 32]);
        assert!(queue.is_empty(process_id));
        assert_eq!(queue.pop(process_id), None);
    }
}
