//! # Property-Based Tests
//!
//! Structural invariants of matching, splicing, repair and decomposition
//! over randomly sized pools and seeds.

use filmswap_core::{
    AssignmentGraph, Participant, ParticipantId, Snapshot, decompose, derangement,
    match_participants, remove_participant, verify_cover,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeSet;

fn joined(id: u64) -> Participant {
    Participant::new(ParticipantId(id), format!("p{id}")).with_letter("letter")
}

fn matched_snapshot(size: u64, seed: u64) -> Snapshot {
    let snapshot = Snapshot::new((1..=size).map(joined), []);
    let outcome =
        match_participants(&snapshot, &mut StdRng::seed_from_u64(seed)).expect("match");
    let mut after = snapshot;
    after.apply(&outcome.mutations).expect("apply");
    after
}

fn edge_set(snapshot: &Snapshot) -> BTreeSet<(ParticipantId, ParticipantId)> {
    let graph = AssignmentGraph::from_snapshot(snapshot).expect("valid");
    decompose(&graph)
        .expect("decompose")
        .iter()
        .flat_map(|c| c.edge_set())
        .collect()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A derangement is a permutation with no fixed point.
    #[test]
    fn derangement_is_fixed_point_free(n in 2usize..200, seed in any::<u64>()) {
        let perm = derangement(n, &mut StdRng::seed_from_u64(seed));

        prop_assert!(perm.iter().enumerate().all(|(i, &p)| i != p));
        let distinct: BTreeSet<usize> = perm.iter().copied().collect();
        prop_assert_eq!(distinct.len(), n);
        prop_assert!(perm.iter().all(|&p| p < n));
    }

    /// Matching a fresh pool yields a cycle cover of exactly the pool.
    #[test]
    fn matching_yields_cycle_cover(size in 2u64..80, seed in any::<u64>()) {
        let snapshot = matched_snapshot(size, seed);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");
        let cycles = decompose(&graph).expect("decompose");

        verify_cover(&graph, &cycles).expect("cover");
        prop_assert!(cycles.iter().all(|c| c.len() >= 2));
        prop_assert_eq!(cycles.iter().map(|c| c.len()).sum::<usize>(), size as usize);
    }

    /// Latecomers are spliced in without moving any untouched edge.
    #[test]
    fn splice_preserves_prior_edges(
        size in 2u64..40,
        late in 1u64..10,
        seed in any::<u64>()
    ) {
        let before = matched_snapshot(size, seed);
        let with_latecomers = Snapshot::new(
            before.participants().cloned().chain((1..=late).map(|i| joined(1000 + i))),
            [],
        );

        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let outcome = match_participants(&with_latecomers, &mut rng).expect("splice");
        let mut after = with_latecomers.clone();
        after.apply(&outcome.mutations).expect("apply");

        prop_assert_eq!(outcome.newly_matched.len(), late as usize);
        prop_assert_eq!(after.matched().count(), (size + late) as usize);

        // Each old edge either survives or was split through newcomers only.
        let new_edges = edge_set(&after);
        for (from, to) in edge_set(&before) {
            let mut current = from;
            loop {
                let next = after.require(current).expect("present").giftee.expect("matched");
                if next == to {
                    break;
                }
                prop_assert!(next.value() > 1000, "old edge rerouted through {}", next);
                current = next;
            }
        }
        prop_assert_eq!(new_edges.len(), (size + late) as usize);
    }

    /// Removing any matched participant leaves a valid assignment without it.
    #[test]
    fn repair_preserves_invariants(size in 2u64..50, pick in any::<u64>(), seed in any::<u64>()) {
        let snapshot = matched_snapshot(size, seed);
        let victim = ParticipantId(pick % size + 1);

        let outcome = remove_participant(&snapshot, victim).expect("repair");
        let mut after = snapshot.clone();
        after.apply(&outcome.mutations).expect("apply");

        let graph = AssignmentGraph::from_snapshot(&after).expect("valid after repair");
        let cycles = decompose(&graph).expect("decompose");
        verify_cover(&graph, &cycles).expect("cover");

        prop_assert!(after.participants().all(|p| p.giftee != Some(victim) && p.santa != Some(victim)));
        prop_assert!(after.require(victim).expect("still stored").is_unmatched());
    }

    /// Decomposition is deterministic and independent of walk start.
    #[test]
    fn decomposition_is_deterministic(size in 2u64..60, seed in any::<u64>()) {
        let snapshot = matched_snapshot(size, seed);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");

        let first = decompose(&graph).expect("first");
        let second = decompose(&graph).expect("second");
        prop_assert_eq!(&first, &second);

        // Rotating a cycle's members does not change its edge set.
        for cycle in &first {
            let mut rotated: Vec<_> = cycle.edges().collect();
            rotated.rotate_left(1);
            let rotated: BTreeSet<_> = rotated.into_iter().collect();
            prop_assert_eq!(rotated, cycle.edge_set());
        }
    }
}
