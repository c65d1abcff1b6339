//! # filmswap-core
//!
//! The Assignment Graph Engine for filmswap.
//!
//! Every participant gifts to exactly one other participant (their giftee)
//! and receives from exactly one other participant (their santa). The
//! matched participants form disjoint cycles of length >= 2. This crate
//! builds, extends, repairs, decomposes and reports those cycles.
//!
//! ## Architecture
//!
//! - Each call reads a fresh [`Snapshot`] from a [`ParticipantStore`],
//!   builds an [`AssignmentGraph`] over it, and returns a mutation set
//! - Stores apply a mutation set atomically or not at all
//! - [`SwapEngine`] serializes the read-compute-apply sequence
//! - Randomness is injected, so seeded runs are reproducible
//! - No async, no network: the command layer lives in the `filmswap` app

// =============================================================================
// MODULES
// =============================================================================

pub mod cycles;
pub mod engine;
pub mod formats;
pub mod graph;
pub mod matching;
pub mod notify;
pub mod period;
pub mod primitives;
pub mod repair;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{MutationRecord, Participant, ParticipantId, Patch, SwapError};

// =============================================================================
// RE-EXPORTS: Algorithms
// =============================================================================

pub use cycles::{Cycle, decompose, verify_cover};
pub use graph::AssignmentGraph;
pub use matching::{MatchOutcome, MatchStrategy, derangement, eligible_pool, match_participants};
pub use notify::{Notification, repair_notifications};
pub use period::{SwapPeriod, Transition, deliveries, transition_period};
pub use repair::{Repair, RepairOutcome, remove_participant};
pub use report::{
    GraphLayout, GraphNode, Reveal, RevealFormat, RevealGraph, filter_emoji, pretty_report,
    reveal_graphs, text_report,
};
pub use snapshot::Snapshot;

// =============================================================================
// RE-EXPORTS: Storage and Engine
// =============================================================================

pub use engine::{
    GifteeLetter, JoinOutcome, ReceivedGift, RemovalOutcome, SummaryEntry, SwapEngine, SwapInfo,
    SwapSummary, UnmatchOutcome,
};
pub use formats::{SwapSnapshot, snapshot_from_bytes, snapshot_to_bytes};
pub use store::{MemoryStore, ParticipantStore, RedbStore, StorageBackend, StoreOp, SwapRecord};
