//! # Participant Store
//!
//! Durable state behind the engine: participant records, the banned set,
//! the letters of participants who left, and the current swap record.
//!
//! The engine reads a [`Snapshot`](crate::Snapshot) through
//! [`ParticipantStore::participants`] and [`ParticipantStore::banned`], runs
//! an algorithm in memory, and hands the result back as a batch of
//! [`StoreOp`]s. A batch is applied atomically: either every op lands or
//! the store is left exactly as it was.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: BTreeMap-backed, volatile
//! - [`RedbStore`]: redb database, one write transaction per batch

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::period::SwapPeriod;
use crate::{MutationRecord, Participant, ParticipantId, SwapError};
use serde::{Deserialize, Serialize};

// =============================================================================
// SWAP RECORD
// =============================================================================

/// The single swap that exists per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwapRecord {
    /// Current period.
    pub period: SwapPeriod,
}

impl SwapRecord {
    /// A freshly created swap, in `JOIN`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// STORE OPERATIONS
// =============================================================================

/// One durable change. Batches of these are applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Create the swap. Fails with `SwapAlreadyExists` if one exists.
    CreateSwap(SwapRecord),
    /// Change the period. Fails with `NoActiveSwap` if no swap exists.
    SetPeriod(SwapPeriod),
    /// Add a participant. Fails with `AlreadyJoined` on a duplicate id.
    Insert(Participant),
    /// Update an existing participant. Fails with `UnknownParticipant`.
    Update(MutationRecord),
    /// Remove a participant. Fails with `UnknownParticipant`.
    Delete(ParticipantId),
    /// Add an id to the banned set. Banning twice is a no-op.
    Ban(ParticipantId),
    /// Remove an id from the banned set. Fails with `NotBanned`.
    Unban(ParticipantId),
    /// Keep the letter of a departing participant for a later rejoin.
    /// Replaces any letter kept earlier.
    KeepLetter(ParticipantId, String),
    /// Drop a kept letter. Dropping a letter that was never kept is a no-op.
    ForgetLetter(ParticipantId),
}

impl StoreOp {
    /// Wrap a mutation set as update ops, skipping empty records.
    #[must_use]
    pub fn updates(records: &[MutationRecord]) -> Vec<StoreOp> {
        records
            .iter()
            .filter(|r| !r.is_empty())
            .cloned()
            .map(StoreOp::Update)
            .collect()
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Persistent state collaborator of the engine.
///
/// Implementations must make [`apply`](ParticipantStore::apply) all-or-nothing.
pub trait ParticipantStore {
    /// All participants, in ascending id order.
    fn participants(&self) -> Result<Vec<Participant>, SwapError>;

    /// The banned set, in ascending id order.
    fn banned(&self) -> Result<Vec<ParticipantId>, SwapError>;

    /// The current swap, if one has been created.
    fn swap(&self) -> Result<Option<SwapRecord>, SwapError>;

    /// The letter kept when `id` last left or was banned.
    fn departed_letter(&self, id: ParticipantId) -> Result<Option<String>, SwapError>;

    /// Apply a batch of ops atomically.
    fn apply(&mut self, ops: &[StoreOp]) -> Result<(), SwapError>;
}

/// Storage backend selected at runtime.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile in-memory store.
    InMemory(MemoryStore),
    /// Disk-backed redb store.
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl ParticipantStore for StorageBackend {
    fn participants(&self) -> Result<Vec<Participant>, SwapError> {
        match self {
            Self::InMemory(store) => store.participants(),
            Self::Persistent(store) => store.participants(),
        }
    }

    fn banned(&self) -> Result<Vec<ParticipantId>, SwapError> {
        match self {
            Self::InMemory(store) => store.banned(),
            Self::Persistent(store) => store.banned(),
        }
    }

    fn swap(&self) -> Result<Option<SwapRecord>, SwapError> {
        match self {
            Self::InMemory(store) => store.swap(),
            Self::Persistent(store) => store.swap(),
        }
    }

    fn departed_letter(&self, id: ParticipantId) -> Result<Option<String>, SwapError> {
        match self {
            Self::InMemory(store) => store.departed_letter(id),
            Self::Persistent(store) => store.departed_letter(id),
        }
    }

    fn apply(&mut self, ops: &[StoreOp]) -> Result<(), SwapError> {
        match self {
            Self::InMemory(store) => store.apply(ops),
            Self::Persistent(store) => store.apply(ops),
        }
    }
}
