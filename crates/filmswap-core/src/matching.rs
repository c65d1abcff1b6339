//! # Matching Algorithm
//!
//! Extends the assignment so every eligible participant joins some cycle.
//!
//! - With no existing cycle, the pool is matched by a uniformly random
//!   derangement, giving one or more disjoint cycles of length >= 2.
//! - With existing cycles, each newcomer is spliced into a uniformly chosen
//!   edge `X -> Y`, becoming `X -> new -> Y`. Nobody else's edges move, so
//!   participants who already started on a gift keep their giftee.
//!   The anchor `X` loses any gift prepared for `Y` and is told its giftee
//!   changed.

use crate::graph::AssignmentGraph;
use crate::notify::Notification;
use crate::primitives::{MAX_DERANGEMENT_ATTEMPTS, MIN_MATCH_POOL};
use crate::{MutationRecord, ParticipantId, Snapshot, SwapError};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a matching run extended the assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Nobody new was eligible; nothing changed.
    Noop,
    /// A fresh derangement over the whole pool.
    Derangement,
    /// Newcomers were spliced into existing cycles.
    Splice,
}

/// Result of a matching run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// How the assignment was extended.
    pub strategy: MatchStrategy,
    /// Participants who became matched, in ascending id order.
    pub newly_matched: Vec<ParticipantId>,
    /// Field updates to apply durably.
    pub mutations: Vec<MutationRecord>,
    /// Previously matched participants whose giftee moved to a newcomer.
    pub notifications: Vec<Notification>,
}

impl MatchOutcome {
    /// Check whether the run changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Participants who may be matched now: letter written, not banned,
/// not already matched. Ascending id order.
#[must_use]
pub fn eligible_pool(snapshot: &Snapshot) -> Vec<ParticipantId> {
    snapshot
        .participants()
        .filter(|p| p.has_letter() && p.is_unmatched() && !snapshot.is_banned(p.id))
        .map(|p| p.id)
        .collect()
}

/// Match every eligible participant, leaving existing edges untouched.
///
/// # Errors
///
/// - `InsufficientParticipants` when no cycle exists yet and fewer than
///   two participants are eligible. No mutation is produced.
/// - Any integrity error if the snapshot's assignment is corrupted.
pub fn match_participants<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    rng: &mut R,
) -> Result<MatchOutcome, SwapError> {
    let mut graph = AssignmentGraph::from_snapshot(snapshot)?;
    let mut pool = eligible_pool(snapshot);
    let has_cycles = graph.matched_count() > 0;

    if has_cycles && pool.is_empty() {
        return Ok(MatchOutcome {
            strategy: MatchStrategy::Noop,
            newly_matched: Vec::new(),
            mutations: Vec::new(),
            notifications: Vec::new(),
        });
    }

    let mut moved = BTreeSet::new();
    let strategy = if has_cycles {
        // Random insertion order so the first newcomer has no advantage.
        pool.shuffle(rng);
        for &newcomer in &pool {
            let anchors = graph.matched_ids();
            let after = anchors[rng.gen_range(0..anchors.len())];
            graph.splice_after(after, newcomer)?;
            if !pool.contains(&after) {
                // The gift was picked for the old giftee.
                graph.discard_gift(after)?;
                moved.insert(after);
            }
        }
        MatchStrategy::Splice
    } else {
        if pool.len() < MIN_MATCH_POOL {
            return Err(SwapError::InsufficientParticipants {
                eligible: pool.len(),
            });
        }
        let targets = derangement(pool.len(), rng);
        for (i, &target) in targets.iter().enumerate() {
            graph.connect(pool[i], pool[target])?;
        }
        MatchStrategy::Derangement
    };

    if let Err(e) = graph.verify() {
        tracing::error!(error = %e, "matching produced an invalid assignment");
        return Err(e);
    }

    pool.sort_unstable();
    tracing::info!(
        strategy = ?strategy,
        matched = pool.len(),
        total = graph.matched_count(),
        "matched participants"
    );

    Ok(MatchOutcome {
        strategy,
        newly_matched: pool,
        mutations: graph.mutations(),
        notifications: moved
            .into_iter()
            .map(|recipient| Notification::GifteeChanged { recipient })
            .collect(),
    })
}

/// A uniformly random permutation of `0..n` with no fixed point.
///
/// Shuffles and rejects until a derangement appears. If every attempt fails
/// (probability below 1e-12) it falls back to Sattolo's algorithm, which
/// always yields a single n-cycle.
///
/// `n` must be at least 2.
#[must_use]
pub fn derangement<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();

    for _ in 0..MAX_DERANGEMENT_ATTEMPTS {
        perm.shuffle(rng);
        if perm.iter().enumerate().all(|(i, &p)| i != p) {
            return perm;
        }
    }

    sattolo_cycle(n, rng)
}

/// A uniformly random cyclic permutation of `0..n` (one n-cycle).
fn sattolo_cycle<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.gen_range(0..i);
        perm.swap(i, j);
    }
    perm
}

// =============================================================================
// TESTS
// =============================================================================
