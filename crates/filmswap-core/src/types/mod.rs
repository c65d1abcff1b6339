//! # Core Type Definitions
//!
//! This module contains the data model shared by every engine component:
//! - Participant identifiers and records (`ParticipantId`, `Participant`)
//! - Field-level mutations (`Patch`, `MutationRecord`)
//! - Error types (`SwapError`)
//!
//! ## Structural Invariant
//!
//! If participant A has `giftee = B`, then B has `santa = A`, and vice versa.
//! Algorithms may break this mid-operation but re-establish it before
//! returning a mutation set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque unique identifier of a participant (a chat-platform user id).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticipantId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// PARTICIPANT
// =============================================================================

/// A person enrolled in the swap.
///
/// A participant is "matched" once both `giftee` and `santa` are set, and
/// "unmatched" while both are absent. Exactly one of the two being set is an
/// integrity failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique identifier.
    pub id: ParticipantId,
    /// Display name, refreshed from the chat platform.
    pub name: String,
    /// Free-text letter describing what this participant likes.
    /// Presence gates matching eligibility.
    pub letter: Option<String>,
    /// The gift prepared for this participant's giftee.
    pub gift: Option<String>,
    /// Whether the participant has finished watching what they received.
    pub done_watching: bool,
    /// Who this participant gifts to.
    pub giftee: Option<ParticipantId>,
    /// Who this participant receives from.
    pub santa: Option<ParticipantId>,
}

impl Participant {
    /// Create a freshly joined participant with no letter and no edges.
    #[must_use]
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            letter: None,
            gift: None,
            done_watching: false,
            giftee: None,
            santa: None,
        }
    }

    /// Builder-style letter setter, mostly for tests and imports.
    #[must_use]
    pub fn with_letter(mut self, letter: impl Into<String>) -> Self {
        self.letter = Some(letter.into());
        self
    }

    /// Both edges are populated.
    #[must_use]
    pub fn is_fully_matched(&self) -> bool {
        self.giftee.is_some() && self.santa.is_some()
    }

    /// Neither edge is populated.
    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        self.giftee.is_none() && self.santa.is_none()
    }

    /// The participant has submitted a letter.
    #[must_use]
    pub fn has_letter(&self) -> bool {
        self.letter.is_some()
    }

    /// The participant has submitted a gift for their giftee.
    #[must_use]
    pub fn has_gift(&self) -> bool {
        self.gift.is_some()
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// A single optional-field change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Leave the field as is.
    #[default]
    Unchanged,
    /// Overwrite the field.
    Set(T),
    /// Reset the field to absent.
    Clear,
}

impl<T: Clone> Patch<T> {
    /// Apply this patch to an optional field.
    pub fn apply_to(&self, field: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Set(value) => *field = Some(value.clone()),
            Patch::Clear => *field = None,
        }
    }

    /// Check whether this patch changes anything.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// Build a patch that moves a field from `before` to `after`.
    #[must_use]
    pub fn between(before: &Option<T>, after: &Option<T>) -> Self
    where
        T: PartialEq,
    {
        match (before, after) {
            (b, a) if b == a => Patch::Unchanged,
            (_, Some(value)) => Patch::Set(value.clone()),
            (_, None) => Patch::Clear,
        }
    }
}

/// A field-level update to one participant, applied durably by a store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationRecord {
    /// The participant being updated.
    pub id: ParticipantId,
    /// New giftee edge.
    pub giftee: Patch<ParticipantId>,
    /// New santa edge.
    pub santa: Patch<ParticipantId>,
    /// New gift.
    pub gift: Patch<String>,
    /// New letter.
    pub letter: Patch<String>,
    /// New display name.
    pub name: Option<String>,
    /// New done-watching flag.
    pub done_watching: Option<bool>,
}

impl MutationRecord {
    /// Create an empty record for the given participant.
    #[must_use]
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Check whether this record changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.giftee.is_unchanged()
            && self.santa.is_unchanged()
            && self.gift.is_unchanged()
            && self.letter.is_unchanged()
            && self.name.is_none()
            && self.done_watching.is_none()
    }

    /// Apply this record to a participant in place.
    pub fn apply_to(&self, participant: &mut Participant) {
        self.giftee.apply_to(&mut participant.giftee);
        self.santa.apply_to(&mut participant.santa);
        self.gift.apply_to(&mut participant.gift);
        self.letter.apply_to(&mut participant.letter);
        if let Some(name) = &self.name {
            participant.name.clone_from(name);
        }
        if let Some(done) = self.done_watching {
            participant.done_watching = done;
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the swap engine.
///
/// Integrity failures (see [`SwapError::is_integrity_failure`]) mean the
/// stored assignment is corrupted and must be surfaced to operators. All
/// other variants are ordinary, recoverable outcomes the command layer
/// translates into user-facing messages.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Matching needs at least two eligible participants when no cycle exists.
    #[error("At least 2 unmatched participants with letters are required, found {eligible}")]
    InsufficientParticipants { eligible: usize },

    /// Repair was requested for a participant missing a santa or giftee.
    #[error("Participant {0} does not have both a santa and a giftee")]
    NotFullyMatched(ParticipantId),

    /// The requested swap period name is not recognized.
    #[error("{0} is not a valid period")]
    InvalidPeriod(String),

    /// The matched set is non-empty but decomposition found no cycles.
    #[error("No cycles found in assignment graph")]
    NoCyclesFound,

    /// An operation referenced an id absent from the snapshot.
    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    /// A participant gifts to themselves.
    #[error("Integrity failure: participant {0} is assigned to themselves")]
    SelfLoop(ParticipantId),

    /// Two participants share the same giftee.
    #[error("Integrity failure: participant {target} is the giftee of more than one santa")]
    DuplicateGiftee { target: ParticipantId },

    /// An edge is not mirrored by the opposite field.
    #[error("Integrity failure: {from} gifts to {to} but {to} does not receive from {from}")]
    InconsistentEdge { from: ParticipantId, to: ParticipantId },

    /// A participant has exactly one of santa/giftee.
    #[error("Integrity failure: participant {0} has only one of santa and giftee")]
    HalfMatched(ParticipantId),

    /// An edge points at a participant that does not exist.
    #[error("Integrity failure: {from} points at missing participant {to}")]
    DanglingEdge { from: ParticipantId, to: ParticipantId },

    /// Reporting was requested but nobody is matched.
    #[error("No participants have both a giftee and a santa")]
    NoMatchedParticipants,

    /// No swap has been created yet.
    #[error("No swap has been created")]
    NoActiveSwap,

    /// A swap already exists.
    #[error("A swap already exists")]
    SwapAlreadyExists,

    /// The participant has already joined.
    #[error("Participant {0} has already joined the swap")]
    AlreadyJoined(ParticipantId),

    /// The participant is banned from the swap.
    #[error("Participant {0} is banned from the swap")]
    Banned(ParticipantId),

    /// Unban requested for a participant who is not banned.
    #[error("Participant {0} is not banned")]
    NotBanned(ParticipantId),

    /// The participant is not matched to anyone yet.
    #[error("Participant {0} has not been matched yet")]
    NotMatched(ParticipantId),

    /// A letter was requested but has not been written.
    #[error("Participant {0} has not written a letter")]
    MissingLetter(ParticipantId),

    /// A gift was requested but the santa has not submitted one.
    #[error("The santa of participant {0} has not submitted a gift")]
    MissingGift(ParticipantId),

    /// Gifts are only visible to recipients once the WATCH period starts.
    #[error("Gifts are delivered when the WATCH period starts, the swap is in {0}")]
    GiftsNotDelivered(crate::period::SwapPeriod),

    /// User-provided input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SwapError {
    /// The error signals a corrupted assignment rather than a user mistake.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            SwapError::NoCyclesFound
                | SwapError::SelfLoop(_)
                | SwapError::DuplicateGiftee { .. }
                | SwapError::InconsistentEdge { .. }
                | SwapError::HalfMatched(_)
                | SwapError::DanglingEdge { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_between_detects_changes() {
        let a = Some(ParticipantId(1));
        let b = Some(ParticipantId(2));

        assert_eq!(Patch::between(&a, &a), Patch::Unchanged);
        assert_eq!(Patch::between(&a, &b), Patch::Set(ParticipantId(2)));
        assert_eq!(Patch::between(&a, &None), Patch::Clear);
        assert_eq!(Patch::<ParticipantId>::between(&None, &None), Patch::Unchanged);
    }

    #[test]
    fn mutation_record_applies_every_field() {
        let mut participant = Participant::new(ParticipantId(7), "old").with_letter("hi");
        participant.gift = Some("gift".to_string());

        let record = MutationRecord {
            giftee: Patch::Set(ParticipantId(8)),
            santa: Patch::Set(ParticipantId(9)),
            gift: Patch::Clear,
            letter: Patch::Unchanged,
            name: Some("new".to_string()),
            done_watching: Some(true),
            ..MutationRecord::new(ParticipantId(7))
        };
        record.apply_to(&mut participant);

        assert_eq!(participant.giftee, Some(ParticipantId(8)));
        assert_eq!(participant.santa, Some(ParticipantId(9)));
        assert_eq!(participant.gift, None);
        assert_eq!(participant.letter.as_deref(), Some("hi"));
        assert_eq!(participant.name, "new");
        assert!(participant.done_watching);
    }

    #[test]
    fn empty_record_is_empty() {
        assert!(MutationRecord::new(ParticipantId(1)).is_empty());
    }

    #[test]
    fn integrity_classification() {
        assert!(SwapError::NoCyclesFound.is_integrity_failure());
        assert!(SwapError::SelfLoop(ParticipantId(1)).is_integrity_failure());
        assert!(!SwapError::InsufficientParticipants { eligible: 1 }.is_integrity_failure());
        assert!(!SwapError::NotFullyMatched(ParticipantId(1)).is_integrity_failure());
    }

    #[test]
    fn matched_state_helpers() {
        let mut p = Participant::new(ParticipantId(1), "a");
        assert!(p.is_unmatched());
        p.giftee = Some(ParticipantId(2));
        assert!(!p.is_unmatched());
        assert!(!p.is_fully_matched());
        p.santa = Some(ParticipantId(2));
        assert!(p.is_fully_matched());
    }
}
