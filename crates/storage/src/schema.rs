//! Key layout for the storage prefixes the sequencer writes:
//!
//! | prefix         | key                                  | value                     |
//! |----------------|---------------------------------------|---------------------------|
//! | `proc/`        | `proc/{processID}`                    | [`sequencer_types::Process`] |
//! | `vote/`        | `vote/{processID}/{voterAddr}/{seq}`  | [`sequencer_types::Vote`]  |
//! | `voteid/`      | `voteid/{processID}/{voteID}`         | replay-detection marker   |
//! | `live/`        | `live/{processID}/{voterAddr}`        | [`sequencer_types::LiveBallot`] |
//! | `tree/`        | `tree/{processID}/{nodeKey}`          | tree node bytes           |
//! | `batch/`       | `batch/{processID}/{batchNum}`        | [`sequencer_types::Batch`] |
//! | `tx/`          | `tx/{processID}/{batchNum}`           | submission state          |
//! | `deadletter/`  | `deadletter/{processID}/{voteID}`     | quarantined vote + reason |
//! | `deadletter-batch/` | `deadletter-batch/{processID}/{batchNum}` | quarantined batch/transition + reason |
//! | `results/`     | `results/{processID}`                 | [`sequencer_types::ResultsRecord`] |
//! | `deadletter-results/` | `deadletter-results/{processID}` | quarantined results computation + reason |
//!
//! Keys are built so that lexicographic byte order matches the intended
//! iteration order (ascending sequence, ascending batch number), which is
//! what [`crate::Transaction::iter_prefix`] relies on.

use sequencer_types::{Address, ProcessId, Sequence, VoteId};

fn push_process(buf: &mut Vec<u8>, process_id: &ProcessId) {
    buf.extend_from_slice(process_id.as_bytes());
}

/// `proc/{processID}`
pub fn process_key(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"proc/".to_vec();
    push_process(&mut key, process_id);
    key
}

/// `vote/{processID}/`: prefix for iterating every vote of a process.
pub fn vote_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"vote/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `vote/{processID}/{voterAddr}/{seq}`
pub fn vote_key(process_id: &ProcessId, voter: &Address, seq: Sequence) -> Vec<u8> {
    let mut key = vote_prefix(process_id);
    key.extend_from_slice(voter.as_bytes());
    key.push(b'/');
    key.extend_from_slice(&seq.0.to_be_bytes());
    key
}

/// `voteid/{processID}/{voteID}`: replay-detection marker, written once
/// per accepted voteID so admission can check it independently of which
/// voter slot (and how many overwrites) currently occupies `vote/`.
pub fn voteid_key(process_id: &ProcessId, vote_id: &VoteId) -> Vec<u8> {
    let mut key = b"voteid/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key.extend_from_slice(vote_id.as_hash().as_bytes());
    key
}

/// `live/{processID}/`: prefix for a process's currently-live ballots.
pub fn live_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"live/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `live/{processID}/{voterAddr}`: the ballot (and the weight it was
/// applied with) a voter currently has live in the state tree, looked up by
/// the State-Transition Worker to compute `old_value` for
/// [`sequencer_state_tree`]'s `apply_transition` and to fold the replaced
/// ciphertexts into `subAcc` on overwrite.
pub fn live_key(process_id: &ProcessId, voter: &Address) -> Vec<u8> {
    let mut key = live_prefix(process_id);
    key.extend_from_slice(voter.as_bytes());
    key
}

/// `tree/{processID}/`: prefix for a process's Merkle node namespace.
pub fn tree_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"tree/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `tree/{processID}/{nodeKey}`
pub fn tree_node_key(process_id: &ProcessId, node_key: &[u8]) -> Vec<u8> {
    let mut key = tree_prefix(process_id);
    key.extend_from_slice(node_key);
    key
}

/// `batch/{processID}/`: prefix for iterating a process's batches in order.
pub fn batch_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"batch/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `batch/{processID}/{batchNum}`
pub fn batch_key(process_id: &ProcessId, batch_num: u64) -> Vec<u8> {
    let mut key = batch_prefix(process_id);
    key.extend_from_slice(&batch_num.to_be_bytes());
    key
}

/// `tx/{processID}/`: prefix for a process's submission records.
pub fn submission_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"tx/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `tx/{processID}/{batchNum}`
pub fn submission_key(process_id: &ProcessId, batch_num: u64) -> Vec<u8> {
    let mut key = submission_prefix(process_id);
    key.extend_from_slice(&batch_num.to_be_bytes());
    key
}

/// `deadletter/{processID}/`: prefix for a process's quarantined votes.
pub fn deadletter_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"deadletter/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `deadletter/{processID}/{voteID}`
pub fn deadletter_key(process_id: &ProcessId, vote_id: &VoteId) -> Vec<u8> {
    let mut key = deadletter_prefix(process_id);
    key.extend_from_slice(vote_id.as_hash().as_bytes());
    key
}

/// `deadletter-batch/{processID}/`: prefix for a process's quarantined
/// batches and transitions (proving exhaustion, hard chain failures),
/// distinct from the per-voteID dead letters admission writes.
pub fn deadletter_batch_prefix(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"deadletter-batch/".to_vec();
    push_process(&mut key, process_id);
    key.push(b'/');
    key
}

/// `deadletter-batch/{processID}/{batchNum}`
pub fn deadletter_batch_key(process_id: &ProcessId, batch_num: u64) -> Vec<u8> {
    let mut key = deadletter_batch_prefix(process_id);
    key.extend_from_slice(&batch_num.to_be_bytes());
    key
}

/// `results/{processID}`
pub fn results_key(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"results/".to_vec();
    push_process(&mut key, process_id);
    key
}

/// `deadletter-results/{processID}`: quarantined results computation,
/// written when the results circuit never proves within the retry budget.
pub fn deadletter_results_key(process_id: &ProcessId) -> Vec<u8> {
    let mut key = b"deadletter-results/".to_vec();
    push_process(&mut key, process_id);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::Hash;

    fn pid(n: u8) -> ProcessId {
        ProcessId::from_bytes([n; 32])
    }

    #[test]
    fn vote_keys_sort_by_sequence() {
        let process_id = pid(1);
        let voter = Address::from_bytes([2u8; 20]);
        let earlier = vote_key(&process_id, &voter, Sequence(1));
        let later = vote_key(&process_id, &voter, Sequence(2));
        assert!(earlier < later);
    }

    #[test]
    fn batch_keys_sort_by_batch_number() {
        let process_id = pid(1);
        assert!(batch_key(&process_id, 1) < batch_key(&process_id, 2));
        assert!(batch_key(&process_id, 9) < batch_key(&process_id, 10));
    }

    #[test]
    fn vote_key_starts_with_its_prefix() {
        let process_id = pid(3);
        let voter = Address::from_bytes([4u8; 20]);
        let key = vote_key(&process_id, &voter, Sequence(5));
        assert!(key.starts_with(&vote_prefix(&process_id)));
    }

    #[test]
    fn voteid_key_is_stable_for_the_same_vote_id() {
        let process_id = pid(2);
        let vote_id = VoteId::from_hash(Hash::from_bytes(b"vote-x"));
        assert_eq!(voteid_key(&process_id, &vote_id), voteid_key(&process_id, &vote_id));
    }

    #[test]
    fn deadletter_key_starts_with_its_prefix() {
        let process_id = pid(5);
        let vote_id = VoteId::from_hash(Hash::from_bytes(&[6u8; 40]));
        let key = deadletter_key(&process_id, &vote_id);
        assert!(key.starts_with(&deadletter_prefix(&process_id)));
    }

    #[test]
    fn live_key_starts_with_its_prefix() {
        let process_id = pid(6);
        let voter = Address::from_bytes([7u8; 20]);
        let key = live_key(&process_id, &voter);
        assert!(key.starts_with(&live_prefix(&process_id)));
    }

    #[test]
    fn deadletter_batch_keys_sort_by_batch_number() {
        let process_id = pid(7);
        assert!(deadletter_batch_key(&process_id, 1) < deadletter_batch_key(&process_id, 2));
        assert!(deadletter_batch_key(&process_id, 1).starts_with(&deadletter_batch_prefix(&process_id)));
    }
}
