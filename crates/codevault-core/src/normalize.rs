//! Sequence normalization over interchangeable groups
//!
//! Within each declared group, any permutation of the members collapses to a
//! single arrangement: the smallest id takes the earliest slot the group
//! occupies, the next smallest the next slot, and so on. Slots outside every
//! group are left alone.

use crate::types::FragmentId;

/// Canonicalise `sequence` with respect to `groups`.
///
/// Groups are processed independently in the order given. A group whose
/// members do not appear exactly once each (one missing, one duplicated) is
/// skipped; such a sequence fails comparison later anyway. Overlapping groups
/// are not supported.
pub fn normalize(sequence: &[FragmentId], groups: &[Vec<FragmentId>]) -> Vec<FragmentId> {
    let mut normalized = sequence.to_vec();
    for group in groups {
        normalize_group(&mut normalized, group);
    }
    normalized
}

fn normalize_group(sequence: &mut [FragmentId], group: &[FragmentId]) {
    let positions: Vec<usize> = sequence
        .iter()
        .enumerate()
        .filter(|(_, id)| group.contains(id))
        .map(|(pos, _)| pos)
        .collect();
    if positions.len() != group.len() {
        return;
    }

    // Sort what actually occupies the slots, not the declared members.
    let mut occupants: Vec<FragmentId> = positions.iter().map(|&p| sequence[p].clone()).collect();
    occupants.sort();

    // `positions` is already ascending from the enumerate scan.
    for (pos, id) in positions.into_iter().zip(occupants) {
        sequence[pos] = id;
    }
}
