//! In-memory participant store.

use super::{ParticipantStore, StoreOp, SwapRecord};
use crate::{Participant, ParticipantId, SwapError};
use std::collections::{BTreeMap, BTreeSet};

/// A volatile store backed by ordered maps.
///
/// Batches are validated and applied on a copy, which replaces the live
/// state only if every op succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    participants: BTreeMap<ParticipantId, Participant>,
    banned: BTreeSet<ParticipantId>,
    departed: BTreeMap<ParticipantId, String>,
    swap: Option<SwapRecord>,
}

impl MemoryStore {
    /// Create an empty store with no swap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously exported state.
    #[must_use]
    pub fn from_parts(
        swap: Option<SwapRecord>,
        participants: impl IntoIterator<Item = Participant>,
        banned: impl IntoIterator<Item = ParticipantId>,
    ) -> Self {
        Self {
            participants: participants.into_iter().map(|p| (p.id, p)).collect(),
            banned: banned.into_iter().collect(),
            departed: BTreeMap::new(),
            swap,
        }
    }

    fn apply_one(&mut self, op: &StoreOp) -> Result<(), SwapError> {
        match op {
            StoreOp::CreateSwap(record) => {
                if self.swap.is_some() {
                    return Err(SwapError::SwapAlreadyExists);
                }
                self.swap = Some(*record);
            }
            StoreOp::SetPeriod(period) => {
                let swap = self.swap.as_mut().ok_or(SwapError::NoActiveSwap)?;
                swap.period = *period;
            }
            StoreOp::Insert(participant) => {
                if self.participants.contains_key(&participant.id) {
                    return Err(SwapError::AlreadyJoined(participant.id));
                }
                self.participants.insert(participant.id, participant.clone());
            }
            StoreOp::Update(record) => {
                let participant = self
                    .participants
                    .get_mut(&record.id)
                    .ok_or(SwapError::UnknownParticipant(record.id))?;
                record.apply_to(participant);
            }
            StoreOp::Delete(id) => {
                self.participants
                    .remove(id)
                    .ok_or(SwapError::UnknownParticipant(*id))?;
            }
            StoreOp::Ban(id) => {
                self.banned.insert(*id);
            }
            StoreOp::Unban(id) => {
                if !self.banned.remove(id) {
                    return Err(SwapError::NotBanned(*id));
                }
            }
            StoreOp::KeepLetter(id, letter) => {
                self.departed.insert(*id, letter.clone());
            }
            StoreOp::ForgetLetter(id) => {
                self.departed.remove(id);
            }
        }
        Ok(())
    }
}

impl ParticipantStore for MemoryStore {
    fn participants(&self) -> Result<Vec<Participant>, SwapError> {
        Ok(self.participants.values().cloned().collect())
    }

    fn banned(&self) -> Result<Vec<ParticipantId>, SwapError> {
        Ok(self.banned.iter().copied().collect())
    }

    fn swap(&self) -> Result<Option<SwapRecord>, SwapError> {
        Ok(self.swap)
    }

    fn departed_letter(&self, id: ParticipantId) -> Result<Option<String>, SwapError> {
        Ok(self.departed.get(&id).cloned())
    }

    fn apply(&mut self, ops: &[StoreOp]) -> Result<(), SwapError> {
        let mut staged = self.clone();
        for op in ops {
            staged.apply_one(op)?;
        }
        *self = staged;
        Ok(())
    }
}
