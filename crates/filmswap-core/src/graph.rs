//! # Assignment Graph
//!
//! The in-memory functional graph built fresh from a [`Snapshot`] at the
//! start of every engine call and discarded afterwards.
//!
//! Participants live in an arena (`Vec<Slot>`) ordered by id; edges are
//! arena indices, so there is no pointer graph and no index can outlive the
//! snapshot it was built from. Edits are recorded in place and turned into a
//! minimal mutation set by [`AssignmentGraph::mutations`].

use crate::{MutationRecord, ParticipantId, Patch, Snapshot, SwapError};
use std::collections::BTreeMap;

/// One participant in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    id: ParticipantId,
    giftee: Option<usize>,
    santa: Option<usize>,
    has_gift: bool,
    clear_gift: bool,
}

/// Arena-of-participants view of the giftee/santa fields.
///
/// Uses `BTreeMap` for the id index so iteration order is deterministic.
#[derive(Debug, Clone)]
pub struct AssignmentGraph {
    /// Participants in ascending id order.
    slots: Vec<Slot>,
    /// Reverse lookup: ParticipantId -> arena index.
    index: BTreeMap<ParticipantId, usize>,
    /// Edges as loaded, used to diff out the mutation set.
    original: Vec<(Option<usize>, Option<usize>)>,
}

impl AssignmentGraph {
    /// Build the graph from a snapshot and verify the structural invariants.
    ///
    /// Fails with an integrity error if any edge dangles, is one-sided,
    /// is a self-loop, or shares a giftee with another edge.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, SwapError> {
        let index: BTreeMap<ParticipantId, usize> = snapshot
            .participants()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let resolve = |from: ParticipantId, to: Option<ParticipantId>| match to {
            None => Ok(None),
            Some(to) => index
                .get(&to)
                .copied()
                .map(Some)
                .ok_or(SwapError::DanglingEdge { from, to }),
        };

        let mut slots = Vec::with_capacity(snapshot.len());
        for participant in snapshot.participants() {
            slots.push(Slot {
                id: participant.id,
                giftee: resolve(participant.id, participant.giftee)?,
                santa: resolve(participant.id, participant.santa)?,
                has_gift: participant.has_gift(),
                clear_gift: false,
            });
        }

        let original = slots.iter().map(|s| (s.giftee, s.santa)).collect();
        let graph = Self {
            slots,
            index,
            original,
        };
        graph.verify()?;
        Ok(graph)
    }

    /// Check every structural invariant of the current edges.
    ///
    /// - every participant has both edges or neither
    /// - no participant gifts to or receives from themselves
    /// - no two participants share a giftee
    /// - every edge is mirrored by the opposite field
    pub fn verify(&self) -> Result<(), SwapError> {
        let mut has_santa = vec![false; self.slots.len()];

        for (i, slot) in self.slots.iter().enumerate() {
            match (slot.giftee, slot.santa) {
                (None, None) => {}
                (Some(giftee), Some(santa)) => {
                    if giftee == i || santa == i {
                        return Err(SwapError::SelfLoop(slot.id));
                    }
                    if has_santa[giftee] {
                        return Err(SwapError::DuplicateGiftee {
                            target: self.slots[giftee].id,
                        });
                    }
                    has_santa[giftee] = true;

                    if self.slots[giftee].santa != Some(i) {
                        return Err(SwapError::InconsistentEdge {
                            from: slot.id,
                            to: self.slots[giftee].id,
                        });
                    }
                    if self.slots[santa].giftee != Some(i) {
                        return Err(SwapError::InconsistentEdge {
                            from: self.slots[santa].id,
                            to: slot.id,
                        });
                    }
                }
                _ => return Err(SwapError::HalfMatched(slot.id)),
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Number of participants in the arena (matched or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check whether a participant is in the arena.
    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.index.contains_key(&id)
    }

    /// Who `id` gifts to.
    #[must_use]
    pub fn giftee_of(&self, id: ParticipantId) -> Option<ParticipantId> {
        let slot = &self.slots[*self.index.get(&id)?];
        slot.giftee.map(|g| self.slots[g].id)
    }

    /// Who `id` receives from.
    #[must_use]
    pub fn santa_of(&self, id: ParticipantId) -> Option<ParticipantId> {
        let slot = &self.slots[*self.index.get(&id)?];
        slot.santa.map(|s| self.slots[s].id)
    }

    /// Check whether `id` has both edges.
    #[must_use]
    pub fn is_matched(&self, id: ParticipantId) -> bool {
        self.index
            .get(&id)
            .is_some_and(|&i| self.slots[i].giftee.is_some() && self.slots[i].santa.is_some())
    }

    /// Matched participants in ascending id order.
    #[must_use]
    pub fn matched_ids(&self) -> Vec<ParticipantId> {
        self.slots
            .iter()
            .filter(|s| s.giftee.is_some())
            .map(|s| s.id)
            .collect()
    }

    /// Number of matched participants.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.slots.iter().filter(|s| s.giftee.is_some()).count()
    }

    /// All giftee edges `(santa, giftee)` in ascending santa order.
    #[must_use]
    pub fn edges(&self) -> Vec<(ParticipantId, ParticipantId)> {
        self.slots
            .iter()
            .filter_map(|s| s.giftee.map(|g| (s.id, self.slots[g].id)))
            .collect()
    }

    /// Check whether any edge still points at `id`.
    #[must_use]
    pub fn references(&self, id: ParticipantId) -> bool {
        let Some(&target) = self.index.get(&id) else {
            return false;
        };
        self.slots
            .iter()
            .any(|s| s.giftee == Some(target) || s.santa == Some(target))
    }

    // -------------------------------------------------------------------------
    // Surgery
    // -------------------------------------------------------------------------

    /// Rewrite edge `after -> next` into `after -> new -> next`.
    ///
    /// `after` must be matched and `new` must be unmatched. The edges of
    /// every other participant are left untouched.
    pub fn splice_after(
        &mut self,
        after: ParticipantId,
        new: ParticipantId,
    ) -> Result<(), SwapError> {
        let a = self.index_of(after)?;
        let n = self.index_of(new)?;

        let Some(next) = self.slots[a].giftee else {
            return Err(SwapError::NotMatched(after));
        };
        if self.slots[n].giftee.is_some() || self.slots[n].santa.is_some() {
            return Err(SwapError::InvalidInput(format!(
                "participant {new} is already matched"
            )));
        }

        self.link(a, n);
        self.link(n, next);
        Ok(())
    }

    /// Add edge `from -> to` between two unmatched participants' halves.
    ///
    /// Used when building a fresh derangement; callers are responsible for
    /// completing the cycle before calling [`AssignmentGraph::verify`].
    pub fn connect(&mut self, from: ParticipantId, to: ParticipantId) -> Result<(), SwapError> {
        let f = self.index_of(from)?;
        let t = self.index_of(to)?;
        if f == t {
            return Err(SwapError::SelfLoop(from));
        }
        self.link(f, t);
        Ok(())
    }

    /// Drop both edges of `id` without touching its neighbours.
    pub fn detach(&mut self, id: ParticipantId) -> Result<(), SwapError> {
        let i = self.index_of(id)?;
        self.slots[i].giftee = None;
        self.slots[i].santa = None;
        Ok(())
    }

    /// Clear the gift of `id` if one was prepared.
    pub fn discard_gift(&mut self, id: ParticipantId) -> Result<(), SwapError> {
        let i = self.index_of(id)?;
        let slot = &mut self.slots[i];
        slot.clear_gift = slot.has_gift;
        Ok(())
    }

    /// Minimal mutation set turning the loaded edges into the current ones.
    ///
    /// Records are emitted in ascending id order; participants whose fields
    /// did not change are omitted.
    #[must_use]
    pub fn mutations(&self) -> Vec<MutationRecord> {
        let id_of = |i: Option<usize>| i.map(|i| self.slots[i].id);

        self.slots
            .iter()
            .zip(&self.original)
            .filter_map(|(slot, &(giftee, santa))| {
                let record = MutationRecord {
                    giftee: Patch::between(&id_of(giftee), &id_of(slot.giftee)),
                    santa: Patch::between(&id_of(santa), &id_of(slot.santa)),
                    gift: if slot.clear_gift {
                        Patch::Clear
                    } else {
                        Patch::Unchanged
                    },
                    ..MutationRecord::new(slot.id)
                };
                (!record.is_empty()).then_some(record)
            })
            .collect()
    }

    fn index_of(&self, id: ParticipantId) -> Result<usize, SwapError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(SwapError::UnknownParticipant(id))
    }

    fn link(&mut self, from: usize, to: usize) {
        self.slots[from].giftee = Some(to);
        self.slots[to].santa = Some(from);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Participant;

    fn participant(id: u64, giftee: Option<u64>, santa: Option<u64>) -> Participant {
        let mut p = Participant::new(ParticipantId(id), format!("p{id}")).with_letter("letter");
        p.giftee = giftee.map(ParticipantId);
        p.santa = santa.map(ParticipantId);
        p
    }

    fn triangle() -> Snapshot {
        // 1 -> 2 -> 3 -> 1
        Snapshot::new(
            [
                participant(1, Some(2), Some(3)),
                participant(2, Some(3), Some(1)),
                participant(3, Some(1), Some(2)),
            ],
            [],
        )
    }

    #[test]
    fn builds_valid_triangle() {
        let graph = AssignmentGraph::from_snapshot(&triangle()).expect("valid");
        assert_eq!(graph.matched_count(), 3);
        assert_eq!(graph.giftee_of(ParticipantId(1)), Some(ParticipantId(2)));
        assert_eq!(graph.santa_of(ParticipantId(1)), Some(ParticipantId(3)));
        assert!(graph.mutations().is_empty());
    }

    #[test]
    fn rejects_self_loop() {
        let snapshot = Snapshot::new([participant(1, Some(1), Some(1))], []);
        let result = AssignmentGraph::from_snapshot(&snapshot);
        assert!(matches!(result, Err(SwapError::SelfLoop(ParticipantId(1)))));
    }

    #[test]
    fn rejects_half_matched() {
        let snapshot = Snapshot::new(
            [participant(1, Some(2), None), participant(2, None, Some(1))],
            [],
        );
        let result = AssignmentGraph::from_snapshot(&snapshot);
        assert!(matches!(result, Err(SwapError::HalfMatched(ParticipantId(1)))));
    }

    #[test]
    fn rejects_dangling_edge() {
        let snapshot = Snapshot::new(
            [participant(1, Some(9), Some(2)), participant(2, Some(1), Some(1))],
            [],
        );
        let result = AssignmentGraph::from_snapshot(&snapshot);
        assert!(matches!(
            result,
            Err(SwapError::DanglingEdge {
                from: ParticipantId(1),
                to: ParticipantId(9)
            })
        ));
    }

    #[test]
    fn rejects_duplicate_giftee() {
        // 1 -> 3 and 2 -> 3
        let snapshot = Snapshot::new(
            [
                participant(1, Some(3), Some(3)),
                participant(2, Some(3), Some(3)),
                participant(3, Some(1), Some(1)),
            ],
            [],
        );
        let result = AssignmentGraph::from_snapshot(&snapshot);
        assert!(matches!(
            result,
            Err(SwapError::DuplicateGiftee {
                target: ParticipantId(3)
            })
        ));
    }

    #[test]
    fn rejects_unmirrored_edge() {
        // 1 -> 2 but 2's santa is 3
        let snapshot = Snapshot::new(
            [
                participant(1, Some(2), Some(2)),
                participant(2, Some(1), Some(3)),
                participant(3, Some(3), Some(3)),
            ],
            [],
        );
        assert!(AssignmentGraph::from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn splice_rewrites_one_edge_into_two() {
        let base = triangle();
        let snapshot = Snapshot::new(
            base.participants()
                .cloned()
                .chain([participant(4, None, None)]),
            [],
        );
        let mut graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");

        graph
            .splice_after(ParticipantId(1), ParticipantId(4))
            .expect("splice");
        graph.verify().expect("still valid");

        assert_eq!(graph.giftee_of(ParticipantId(1)), Some(ParticipantId(4)));
        assert_eq!(graph.giftee_of(ParticipantId(4)), Some(ParticipantId(2)));
        assert_eq!(graph.santa_of(ParticipantId(2)), Some(ParticipantId(4)));

        // 1's giftee, 2's santa, and 4's both edges changed
        let touched: Vec<_> = graph.mutations().iter().map(|r| r.id).collect();
        assert_eq!(
            touched,
            vec![ParticipantId(1), ParticipantId(2), ParticipantId(4)]
        );
    }

    #[test]
    fn splice_requires_matched_anchor() {
        let snapshot = Snapshot::new([participant(1, None, None), participant(2, None, None)], []);
        let mut graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");
        let result = graph.splice_after(ParticipantId(1), ParticipantId(2));
        assert!(matches!(result, Err(SwapError::NotMatched(ParticipantId(1)))));
    }

    #[test]
    fn discard_gift_only_clears_existing_gift() {
        let mut snapshot_participants: Vec<_> = triangle().participants().cloned().collect();
        snapshot_participants[0].gift = Some("film".to_string());
        let snapshot = Snapshot::new(snapshot_participants, []);
        let mut graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");

        graph.discard_gift(ParticipantId(1)).expect("p1");
        graph.discard_gift(ParticipantId(2)).expect("p2");

        let mutations = graph.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].id, ParticipantId(1));
        assert_eq!(mutations[0].gift, Patch::Clear);
    }

    #[test]
    fn references_tracks_incoming_edges() {
        let mut graph = AssignmentGraph::from_snapshot(&triangle()).expect("valid");
        assert!(graph.references(ParticipantId(2)));
        graph.detach(ParticipantId(1)).expect("detach");
        graph.connect(ParticipantId(3), ParticipantId(2)).expect("connect");
        assert!(!graph.references(ParticipantId(1)));
        graph.verify().expect("3 <-> 2 is a valid 2-cycle");
    }
}
