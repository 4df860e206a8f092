//! Per-process in-memory queue of verified votes awaiting batching.
//!
//! The Aggregator Worker drains this queue in arrival order; within a
//! process, a later vote from the same voter overwrites (rather than
//! appends to) that voter's queued entry, exactly as a later on-chain
//! ballot overwrites an earlier one.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use sequencer_types::{Address, ProcessId, Sequence, VerifiedVote, VoteId};

/// Where a given voteID currently stands, for the poll surface clients use
/// to check on a submitted vote without holding a connection open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteStatus {
    /// Accepted and waiting to be included in a batch.
    Queued,
    /// Popped into a batch that is being aggregated.
    Aggregating,
    /// Applied to the state tree; this is the voter's live ballot.
    Applied,
    /// Superseded by a later vote from the same voter.
    Overwritten,
    /// Rejected during admission, with the reason.
    Rejected(String),
}

struct Slot {
    voter: Address,
    vote_id: VoteId,
    sequence: Sequence,
    vote: VerifiedVote,
}

/// One process's queue of verified, not-yet-batched votes.
struct ProcessQueue {
    order: VecDeque<Slot>,
    next_sequence: Sequence,
}

impl ProcessQueue {
    fn new() -> Self {
        Self {
            order: VecDeque::new(),
            next_sequence: Sequence::FIRST,
        }
    }

    fn push(&mut self, vote: VerifiedVote) -> Sequence {
        let voter = vote.vote.voter;
        let vote_id = vote.vote.vote_id;
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.next();

        if let Some(existing) = self.order.iter_mut().find(|s| s.voter == voter) {
            existing.vote_id = vote_id;
            existing.sequence = sequence;
            existing.vote = vote;
        } else {
            self.order.push_back(Slot { voter, vote_id, sequence, vote });
        }
        sequence
    }

    fn pop_up_to(&mut self, n: usize) -> Vec<VerifiedVote> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.order.pop_front() {
                Some(slot) => out.push(slot.vote),
                None => break,
            }
        }
        out
    }
}

/// In-memory, per-process verified-vote queues, plus the status registry
/// backing [`VoteIntakeQueue::status`].
pub struct VoteIntakeQueue {
    queues: DashMap<ProcessId, Mutex<ProcessQueue>>,
    status: DashMap<(ProcessId, VoteId), VoteStatus>,
}

impl Default for VoteIntakeQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteIntakeQueue {
    /// An empty queue registry.
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
            status: DashMap::new(),
        }
    }

    /// Enqueue a verified vote, overwriting any still-queued vote from the
    /// same voter in the same process.
    pub fn push(&self, process_id: ProcessId, vote: VerifiedVote) {
        let vote_id = vote.vote.vote_id;
        let voter = vote.vote.voter;

        let entry = self.queues.entry(process_id).or_insert_with(|| Mutex::new(ProcessQueue::new()));
        let mut queue = entry.lock().expect("process queue mutex poisoned");

        if let Some(overwritten) = queue.order.iter().find(|s| s.voter == voter) {
            self.status
                .insert((process_id, overwritten.vote_id), VoteStatus::Overwritten);
        }
        queue.push(vote);
        self.status.insert((process_id, vote_id), VoteStatus::Queued);
    }

    /// Record a rejection for a voteID that never made it into the queue.
    pub fn record_rejection(&self, process_id: ProcessId, vote_id: VoteId, reason: String) {
        self.status.insert((process_id, vote_id), VoteStatus::Rejected(reason));
    }

    /// Current number of votes queued for `process_id`.
    pub fn len(&self, process_id: ProcessId) -> usize {
        self.queues
            .get(&process_id)
            .map(|q| q.lock().expect("process queue mutex poisoned").order.len())
            .unwrap_or(0)
    }

    /// Whether `process_id` has no queued votes.
    pub fn is_empty(&self, process_id: ProcessId) -> bool {
        self.len(process_id) == 0
    }

    /// Pop up to `n` votes in arrival order, marking them `Aggregating`.
    pub fn pop_batch(&self, process_id: ProcessId, n: usize) -> Vec<VerifiedVote> {
        let Some(entry) = self.queues.get(&process_id) else {
            return Vec::new();
        };
        let popped = entry.lock().expect("process queue mutex poisoned").pop_up_to(n);
        for vote in &popped {
            self.status
                .insert((process_id, vote.vote.vote_id), VoteStatus::Aggregating);
        }
        popped
    }

    /// Mark a set of voteIDs `Applied` once their batch's state transition
    /// has landed.
    pub fn mark_applied(&self, process_id: ProcessId, vote_ids: &[VoteId]) {
        for vote_id in vote_ids {
            self.status.insert((process_id, *vote_id), VoteStatus::Applied);
        }
    }

    /// Look up a voteID's current status, if this queue has ever seen it.
    pub fn status(&self, process_id: ProcessId, vote_id: VoteId) -> Option<VoteStatus> {
        self.status.get(&(process_id, vote_id)).map(|v| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use sequencer_crypto::{Ciphertext, Point};
    use sequencer_types::{EncryptedBallot, Hash, OpaqueProofBytes, Vote, VoteSignature, Weight};

    fn vote_for(process_id: ProcessId, voter: [u8; 20], tag: &[u8]) -> VerifiedVote {
        VerifiedVote {
            vote: Vote {
                process_id,
                voter: Address::from_bytes(voter),
                vote_id: VoteId::from_hash(Hash::from_bytes(tag)),
                ballot: EncryptedBallot::new(vec![Ciphertext {
                    c1: Point::generator(),
                    c2: Point::generator(),
                }]),
                client_proof: OpaqueProofBytes(vec![]),
                census_proof: OpaqueProofBytes(vec![]),
                signature: VoteSignature(vec![]),
            },
            weight: Weight::new(1),
        }
    }

    #[test]
    fn later_vote_from_same_voter_overwrites_earlier_one() {
        let queue = VoteIntakeQueue::new();
        let process_id = ProcessId::from_bytes([1u8; 32]);
        let voter = [2u8; 20];

        let first = vote_for(process_id, voter, b"first");
        let first_id = first.vote.vote_id;
        queue.push(process_id, first);
        assert_eq!(queue.len(process_id), 1);

        let second = vote_for(process_id, voter, b"second");
        let second_id = second.vote.vote_id;
        queue.push(process_id, second);

        assert_eq!(queue.len(process_id), 1);
        assert_eq!(queue.status(process_id, first_id), Some(VoteStatus::Overwritten));
        assert_eq!(queue.status(process_id, second_id), Some(VoteStatus::Queued));
    }

    #[test]
    fn pop_batch_respects_arrival_order_and_caps_at_n() {
        let queue = VoteIntakeQueue::new();
        let process_id = ProcessId::from_bytes([1u8; 32]);

        for i in 0..5u8 {
            queue.push(process_id, vote_for(process_id, [i; 20], &[i]));
        }

        let batch = queue.pop_batch(process_id, 3);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].vote.voter, Address::from_bytes([0u8; 20]));
        assert_eq!(batch[1].vote.voter, Address::from_bytes([1u8; 20]));
        assert_eq!(batch[2].vote.voter, Address::from_bytes([2u8; 20]));
        assert_eq!(queue.len(process_id), 2);
    }

    #[test]
    fn unknown_process_has_empty_queue() {
        let queue = VoteIntakeQueue::new();
        let process_id = ProcessId::from_bytes([9u8; 32]);
        assert!(queue.is_empty(process_id));
        assert!(queue.pop_batch(process_id, 4).is_empty());
    }
}
