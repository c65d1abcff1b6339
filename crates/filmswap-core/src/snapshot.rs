//! # Participant Snapshot
//!
//! A point-in-time, read-only view of the participant store.
//!
//! Every engine operation starts from a fresh snapshot and never caches it
//! across calls, so there is no long-lived graph to go stale.

use crate::store::ParticipantStore;
use crate::{MutationRecord, Participant, ParticipantId, SwapError};
use std::collections::{BTreeMap, BTreeSet};

/// Participants and the banned set, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    participants: BTreeMap<ParticipantId, Participant>,
    banned: BTreeSet<ParticipantId>,
}

impl Snapshot {
    /// Build a snapshot from already-loaded records.
    #[must_use]
    pub fn new(
        participants: impl IntoIterator<Item = Participant>,
        banned: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        Self {
            participants: participants.into_iter().map(|p| (p.id, p)).collect(),
            banned: banned.into_iter().collect(),
        }
    }

    /// Read a consistent snapshot from a store.
    pub fn load<S: ParticipantStore + ?Sized>(store: &S) -> Result<Self, SwapError> {
        Ok(Self::new(store.participants()?, store.banned()?))
    }

    /// Get a participant by id.
    #[must_use]
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Get a participant by id, failing with `UnknownParticipant`.
    pub fn require(&self, id: ParticipantId) -> Result<&Participant, SwapError> {
        self.get(id).ok_or(SwapError::UnknownParticipant(id))
    }

    /// Check whether a participant is present.
    #[must_use]
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    /// All participants in id order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Participants with both edges populated, in id order.
    pub fn matched(&self) -> impl Iterator<Item = &Participant> {
        self.participants().filter(|p| p.is_fully_matched())
    }

    /// Check whether an id is banned.
    #[must_use]
    pub fn is_banned(&self, id: ParticipantId) -> bool {
        self.banned.contains(&id)
    }

    /// The banned set in id order.
    pub fn banned(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.banned.iter().copied()
    }

    /// Display name for an id, falling back to the numeric id.
    #[must_use]
    pub fn name_of(&self, id: ParticipantId) -> String {
        self.get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Check whether the snapshot has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Apply a mutation set to this in-memory view.
    ///
    /// Records for ids absent from the snapshot are rejected before any
    /// record is applied.
    pub fn apply(&mut self, records: &[MutationRecord]) -> Result<(), SwapError> {
        if let Some(missing) = records.iter().find(|r| !self.contains(r.id)) {
            return Err(SwapError::UnknownParticipant(missing.id));
        }
        for record in records {
            if let Some(participant) = self.participants.get_mut(&record.id) {
                record.apply_to(participant);
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Patch;

    #[test]
    fn name_falls_back_to_id() {
        let snapshot = Snapshot::new([Participant::new(ParticipantId(1), "Alice")], []);
        assert_eq!(snapshot.name_of(ParticipantId(1)), "Alice");
        assert_eq!(snapshot.name_of(ParticipantId(99)), "99");
    }

    #[test]
    fn apply_rejects_unknown_ids_atomically() {
        let mut snapshot = Snapshot::new([Participant::new(ParticipantId(1), "Alice")], []);
        let records = vec![
            MutationRecord {
                letter: Patch::Set("hello".to_string()),
                ..MutationRecord::new(ParticipantId(1))
            },
            MutationRecord::new(ParticipantId(2)),
        ];

        let result = snapshot.apply(&records);
        assert!(matches!(result, Err(SwapError::UnknownParticipant(ParticipantId(2)))));
        assert_eq!(snapshot.require(ParticipantId(1)).expect("present").letter, None);
    }

    #[test]
    fn banned_lookup() {
        let snapshot = Snapshot::new([], [ParticipantId(5)]);
        assert!(snapshot.is_banned(ParticipantId(5)));
        assert!(!snapshot.is_banned(ParticipantId(6)));
        assert!(snapshot.is_empty());
    }
}
