//! # Repair Algorithm
//!
//! Removes one fully matched participant from its cycle.
//!
//! ```text
//! S -> P -> G    becomes    S -> G
//! ```
//!
//! S's gift was prepared for P, so it is cleared. When P sat in a 2-cycle
//! (`S -> P -> S`), there is nobody left for S to gift to: S becomes unmatched
//! instead of forming a self-loop, and the outcome reports it as dissolved.

use crate::graph::AssignmentGraph;
use crate::{MutationRecord, ParticipantId, Snapshot, SwapError};
use serde::{Deserialize, Serialize};

/// How the cycle around the removed participant was repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repair {
    /// The santa now gifts directly to the removed participant's giftee.
    Rerouted {
        santa: ParticipantId,
        giftee: ParticipantId,
    },
    /// The removed participant was in a 2-cycle; the partner is now unmatched.
    Dissolved { partner: ParticipantId },
}

/// Result of removing a participant from the assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// The participant taken out of the graph.
    pub removed: ParticipantId,
    /// How the neighbours were reconnected.
    pub repair: Repair,
    /// Field updates to apply durably.
    pub mutations: Vec<MutationRecord>,
}

impl RepairOutcome {
    /// The former santa of the removed participant (needs a new letter).
    #[must_use]
    pub fn affected_santa(&self) -> ParticipantId {
        match self.repair {
            Repair::Rerouted { santa, .. } => santa,
            Repair::Dissolved { partner } => partner,
        }
    }

    /// The former giftee of the removed participant (gets a new santa).
    #[must_use]
    pub fn affected_giftee(&self) -> ParticipantId {
        match self.repair {
            Repair::Rerouted { giftee, .. } => giftee,
            Repair::Dissolved { partner } => partner,
        }
    }
}

/// Excise `id` from its cycle, reconnecting its santa to its giftee.
///
/// The removed participant's own edges are cleared as well, so after the
/// mutation set is applied its id appears in no `santa` or `giftee` field.
///
/// # Errors
///
/// - `UnknownParticipant` if `id` is not in the snapshot.
/// - `NotFullyMatched` if `id` lacks a santa or giftee. During `JOIN` this is
///   expected and the caller only needs to drop `id` from the pool.
/// - Any integrity error if the snapshot's assignment is corrupted.
pub fn remove_participant(
    snapshot: &Snapshot,
    id: ParticipantId,
) -> Result<RepairOutcome, SwapError> {
    if !snapshot.contains(id) {
        return Err(SwapError::UnknownParticipant(id));
    }
    let mut graph = AssignmentGraph::from_snapshot(snapshot)?;

    let (Some(santa), Some(giftee)) = (graph.santa_of(id), graph.giftee_of(id)) else {
        return Err(SwapError::NotFullyMatched(id));
    };

    tracing::info!(removed = %id, santa = %santa, giftee = %giftee, "repairing cycle");

    graph.detach(id)?;
    graph.discard_gift(santa)?;

    let repair = if santa == giftee {
        graph.detach(santa)?;
        tracing::info!(partner = %santa, "2-cycle dissolved, partner is now unmatched");
        Repair::Dissolved { partner: santa }
    } else {
        graph.connect(santa, giftee)?;
        tracing::info!(santa = %santa, giftee = %giftee, "santa now gifts to giftee");
        Repair::Rerouted { santa, giftee }
    };

    if let Err(e) = graph.verify() {
        tracing::error!(error = %e, removed = %id, "repair produced an invalid assignment");
        return Err(e);
    }
    if graph.references(id) {
        tracing::error!(removed = %id, "removed participant still referenced after repair");
        return Err(SwapError::DanglingEdge {
            from: santa,
            to: id,
        });
    }

    Ok(RepairOutcome {
        removed: id,
        repair,
        mutations: graph.mutations(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
