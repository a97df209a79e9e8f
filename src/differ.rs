use crate::types::Entry;
use std::collections::HashSet;

/// Positions in `current` whose height was not present in `previous`.
///
/// A first observation (empty `previous`) yields the empty set so the whole
/// initial page is not flagged as new.
pub fn new_positions(previous: &[Entry], current: &[Entry]) -> HashSet<usize> {
    if previous.is_empty() {
        return HashSet::new();
    }
    let known: HashSet<u64> = previous.iter().map(|e| e.height).collect();
    current
        .iter()
        .enumerate()
        .filter(|(_, e)| !known.contains(&e.height))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(height: u64) -> Entry {
        Entry {
            height,
            hash: format!("hash{height}"),
            timestamp: String::new(),
            tx_count: None,
            utxo_created: None,
            utxo_spent: None,
            processing_time_ms: None,
        }
    }

    #[test]
    fn first_observation_is_never_flagged() {
        let current = vec![entry(3), entry(2), entry(1)];
        assert!(new_positions(&[], &current).is_empty());
    }

    #[test]
    fn identical_snapshots_diff_to_empty() {
        let s = vec![entry(5), entry(4)];
        assert!(new_positions(&s, &s).is_empty());
    }

    #[test]
    fn prepended_heights_are_flagged_by_position() {
        let prev = vec![entry(100), entry(99)];
        let cur = vec![entry(102), entry(101), entry(100), entry(99)];
        let fresh = new_positions(&prev, &cur);
        assert_eq!(fresh, HashSet::from([0, 1]));
    }

    #[test]
    fn non_contiguous_heights_still_compare_by_membership() {
        let prev = vec![entry(10), entry(7)];
        let cur = vec![entry(12), entry(10), entry(7)];
        assert_eq!(new_positions(&prev, &cur), HashSet::from([0]));
    }
}
