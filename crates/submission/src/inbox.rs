//! Per-process FIFO of outputs ready for on-chain submission.
//!
//! Both the State-Transition Worker and the Results Worker feed this queue;
//! it is owned here (rather than by either producer) since it has two
//! producers and one consumer. Mirrors `sequencer_aggregator::ReadyBatchQueue`'s
//! shape.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sequencer_types::{ProcessId, ResultsRecord, StateTransition};

/// One unit of work the Submission Manager must carry on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubmissionItem {
    /// A state-transition batch output.
    Transition(StateTransition),
    /// A process's final decrypted tallies.
    Results(ResultsRecord),
}

impl SubmissionItem {
    /// The process this item belongs to.
    pub fn process_id(&self) -> ProcessId {
        match self {
            SubmissionItem::Transition(t) => t.process_id,
            SubmissionItem::Results(r) => r.process_id,
        }
    }
}

/// Per-process queue of items awaiting on-chain submission.
#[derive(Default)]
pub struct SubmissionInbox {
    queues: DashMap<ProcessId, Mutex<VecDeque<SubmissionItem>>>,
}

impl SubmissionInbox {
    /// An empty inbox.
    pub fn new() -> Self {
        Self { queues: DashMap::new() }
    }

    /// Enqueue an item, under its own process's FIFO.
    pub fn push(&self, item: SubmissionItem) {
        let process_id = item.process_id();
        self.queues
            .entry(process_id)
            .or_insert_with(|| Mutex::new(VecDeque::new()))
            .lock()
            .expect("submission inbox mutex poisoned")
            .push_back(item);
    }

    /// Pop the oldest queued item for `process_id`, if any.
    pub fn pop(&self, process_id: ProcessId) -> Option<SubmissionItem> {
        let entry = self.queues.get(&process_id)?;
        entry.lock().expect("submission inbox mutex poisoned").pop_front()
    }

    /// Number of items currently queued for `process_id`.
    pub fn len(&self, process_id: ProcessId) -> usize {
        self.queues
            .get(&process_id)
            .map(|q| q.lock().expect("submission inbox mutex poisoned").len())
            .unwrap_or(0)
    }

    /// Whether `process_id` has no queued items.
    pub fn is_empty(&self, process_id: ProcessId) -> bool {
        self.len(process_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::OpaqueProofBytes;

    fn transition(process_id: ProcessId) -> StateTransition {
        StateTransition {
            process_id,
            old_root: [0u8; 32],
            new_root: [1u8; 32],
            proof: OpaqueProofBytes(vec![]),
            add_acc: vec![],
            sub_acc: vec![],
            batch_hash: sequencer_crypto::Fr::from(1u64),
        }
    }

    #[test]
    fn pops_in_fifo_order_across_both_producers() {
        let inbox = SubmissionInbox::new();
        let process_id = ProcessId::from_bytes([1u8; 32]);

        inbox.push(SubmissionItem::Transition(transition(process_id)));
        inbox.push(SubmissionItem::Results(ResultsRecord {
            process_id,
            tallies: vec![3, 7],
            proof: OpaqueProofBytes(vec![]),
        }));

        assert_eq!(inbox.len(process_id), 2);
        assert!(matches!(inbox.pop(process_id), Some(SubmissionItem::Transition(_))));
        assert!(matches!(inbox.pop(process_id), Some(SubmissionItem::Results(_))));
        assert!(inbox.is_empty(process_id));
    }

    #[test]
    fn unknown_process_is_empty() {
        let inbox = SubmissionInbox::new();
        let process_id = ProcessId::from_bytes([9u8; 32]);
        assert!(inbox.is_empty(process_id));
        assert!(inbox.pop(process_id).is_none());
    }
}
