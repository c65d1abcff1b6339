//! # Cycle Decomposition
//!
//! Recovers the disjoint simple cycles of the assignment.
//!
//! Every matched participant has out-degree and in-degree exactly 1, so the
//! matched set is a permutation and decomposes into cycles with no tails.
//! Walking giftee edges from each not-yet-visited participant (in ascending
//! id order) yields each cycle exactly once.

use crate::graph::AssignmentGraph;
use crate::{ParticipantId, SwapError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One assignment cycle `P1 -> P2 -> ... -> Pn -> P1`.
///
/// Members are stored starting from the smallest id, in giftee order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    members: Vec<ParticipantId>,
}

impl Cycle {
    /// Members in giftee order, starting from the smallest id.
    #[must_use]
    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    /// Number of participants in the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a cycle produced by [`decompose`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check whether a participant belongs to this cycle.
    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.members.contains(&id)
    }

    /// Giftee edges `(santa, giftee)` of this cycle, closing back to the start.
    pub fn edges(&self) -> impl Iterator<Item = (ParticipantId, ParticipantId)> + '_ {
        self.members
            .iter()
            .zip(self.members.iter().cycle().skip(1))
            .map(|(&from, &to)| (from, to))
    }

    /// The edge set, independent of which member a walk started from.
    #[must_use]
    pub fn edge_set(&self) -> BTreeSet<(ParticipantId, ParticipantId)> {
        self.edges().collect()
    }
}

/// Decompose the matched part of the graph into disjoint cycles.
///
/// Returns an empty list when nobody is matched.
///
/// # Errors
///
/// - `NoCyclesFound` if participants are matched but no cycle was recovered.
/// - `SelfLoop` or `InconsistentEdge` if a walk does not close cleanly.
pub fn decompose(graph: &AssignmentGraph) -> Result<Vec<Cycle>, SwapError> {
    let matched = graph.matched_ids();
    let mut visited: BTreeSet<ParticipantId> = BTreeSet::new();
    let mut cycles = Vec::new();

    for &start in &matched {
        if visited.contains(&start) {
            continue;
        }

        let mut members = Vec::new();
        let mut current = start;
        loop {
            visited.insert(current);
            members.push(current);

            let next = graph
                .giftee_of(current)
                .ok_or(SwapError::HalfMatched(current))?;
            if next == start {
                break;
            }
            // Revisiting anything but the start means a tail or a merge.
            if visited.contains(&next) || members.len() > matched.len() {
                return Err(SwapError::InconsistentEdge {
                    from: current,
                    to: next,
                });
            }
            current = next;
        }

        if members.len() < 2 {
            return Err(SwapError::SelfLoop(start));
        }
        cycles.push(Cycle { members });
    }

    if !matched.is_empty() && cycles.is_empty() {
        return Err(SwapError::NoCyclesFound);
    }

    Ok(cycles)
}

/// Check that `cycles` exactly covers the matched set of `graph`.
///
/// Every cycle must have length >= 2, walking each cycle must follow real
/// giftee edges, and the union of members must equal the matched set with
/// no participant in two cycles.
pub fn verify_cover(graph: &AssignmentGraph, cycles: &[Cycle]) -> Result<(), SwapError> {
    let mut owner: BTreeMap<ParticipantId, usize> = BTreeMap::new();

    for (n, cycle) in cycles.iter().enumerate() {
        if cycle.len() < 2 {
            let id = cycle.members().first().copied().unwrap_or_default();
            return Err(SwapError::SelfLoop(id));
        }
        for (from, to) in cycle.edges() {
            if graph.giftee_of(from) != Some(to) {
                return Err(SwapError::InconsistentEdge { from, to });
            }
            if owner.insert(from, n).is_some() {
                return Err(SwapError::DuplicateGiftee { target: to });
            }
        }
    }

    let covered: Vec<ParticipantId> = owner.keys().copied().collect();
    if covered != graph.matched_ids() {
        return Err(SwapError::NoCyclesFound);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Participant, Snapshot};

    fn ring(ids: &[u64]) -> Vec<Participant> {
        let n = ids.len();
        (0..n)
            .map(|i| {
                let mut p = Participant::new(ParticipantId(ids[i]), format!("p{}", ids[i]));
                p.giftee = Some(ParticipantId(ids[(i + 1) % n]));
                p.santa = Some(ParticipantId(ids[(i + n - 1) % n]));
                p
            })
            .collect()
    }

    #[test]
    fn single_cycle() {
        let snapshot = Snapshot::new(ring(&[3, 1, 2]), []);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");

        let cycles = decompose(&graph).expect("decompose");
        assert_eq!(cycles.len(), 1);
        // 3 -> 1 -> 2 -> 3, reported from the smallest id
        assert_eq!(
            cycles[0].members(),
            &[ParticipantId(1), ParticipantId(2), ParticipantId(3)]
        );
        verify_cover(&graph, &cycles).expect("cover");
    }

    #[test]
    fn disjoint_cycles() {
        let mut participants = ring(&[1, 2]);
        participants.extend(ring(&[10, 30, 20]));
        participants.push(Participant::new(ParticipantId(99), "unmatched"));
        let snapshot = Snapshot::new(participants, []);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");

        let cycles = decompose(&graph).expect("decompose");
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].len(), 2);
        assert_eq!(cycles[1].len(), 3);
        assert!(!cycles.iter().any(|c| c.contains(ParticipantId(99))));
        verify_cover(&graph, &cycles).expect("cover");
    }

    #[test]
    fn empty_graph_has_no_cycles() {
        let graph = AssignmentGraph::from_snapshot(&Snapshot::default()).expect("valid");
        assert!(decompose(&graph).expect("decompose").is_empty());
    }

    #[test]
    fn edges_close_the_cycle() {
        let snapshot = Snapshot::new(ring(&[1, 2, 3]), []);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");
        let cycles = decompose(&graph).expect("decompose");

        let edges: Vec<_> = cycles[0].edges().collect();
        assert_eq!(
            edges,
            vec![
                (ParticipantId(1), ParticipantId(2)),
                (ParticipantId(2), ParticipantId(3)),
                (ParticipantId(3), ParticipantId(1)),
            ]
        );
    }

    #[test]
    fn cover_rejects_missing_cycle() {
        let mut participants = ring(&[1, 2]);
        participants.extend(ring(&[3, 4]));
        let graph = AssignmentGraph::from_snapshot(&Snapshot::new(participants, [])).expect("valid");

        let mut cycles = decompose(&graph).expect("decompose");
        cycles.pop();
        assert!(matches!(
            verify_cover(&graph, &cycles),
            Err(SwapError::NoCyclesFound)
        ));
    }
}
