//! # Swap Engine
//!
//! The serialized façade the command layer talks to.
//!
//! Every mutating call runs `snapshot -> algorithm -> apply` under the store's
//! write lock, so two concurrent matches or removals can never interleave.
//! Read-only calls (reveal, summary, letter lookups) share the read lock.
//! Notifications are returned as data after the lock has been released;
//! the engine itself never talks to anyone.
//!
//! Lock order is always store first, then rng.

use crate::cycles::{Cycle, decompose, verify_cover};
use crate::formats::SwapSnapshot;
use crate::graph::AssignmentGraph;
use crate::matching::{MatchOutcome, match_participants};
use crate::notify::{Notification, repair_notifications};
use crate::period::{SwapPeriod, Transition, transition_period};
use crate::primitives::{MAX_GIFT_LENGTH, MAX_LETTER_LENGTH, MAX_NAME_LENGTH};
use crate::repair::{Repair, remove_participant};
use crate::report::{GraphLayout, Reveal, RevealFormat, reveal};
use crate::store::{MemoryStore, ParticipantStore, StoreOp, SwapRecord};
use crate::{MutationRecord, Participant, ParticipantId, Patch, Snapshot, SwapError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// OUTCOMES
// =============================================================================

/// Headline numbers of the current swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapInfo {
    pub period: SwapPeriod,
    pub participants: usize,
    pub matched: usize,
    pub banned: usize,
}

/// Result of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub participant: Participant,
    /// The letter from the participant's previous enrollment was restored.
    pub letter_restored: bool,
}

/// The letter a santa should read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifteeLetter {
    pub giftee: ParticipantId,
    pub name: String,
    pub letter: String,
}

/// The gift a participant received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedGift {
    pub santa: ParticipantId,
    pub gift: String,
}

/// Result of a leave or ban.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    pub removed: ParticipantId,
    /// The id was added to the banned set.
    pub banned: bool,
    /// How the cycle was repaired, or `None` if the participant was unmatched.
    pub repair: Option<Repair>,
    pub notifications: Vec<Notification>,
}

/// Participants who became unmatched by [`SwapEngine::unmatch_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchOutcome {
    pub unmatched: Vec<ParticipantId>,
}

/// A participant listed in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub id: ParticipantId,
    pub name: String,
}

/// Administrator overview of the swap.
///
/// Every list except `all` and `without_letters` only counts active
/// participants, i.e. those who have written a letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSummary {
    pub period: SwapPeriod,
    pub all: Vec<SummaryEntry>,
    pub without_letters: Vec<SummaryEntry>,
    pub without_gifts: Vec<SummaryEntry>,
    pub not_done_watching: Vec<SummaryEntry>,
    pub without_giftees: Vec<SummaryEntry>,
    pub without_santas: Vec<SummaryEntry>,
    pub banned: Vec<SummaryEntry>,
}

impl SwapSummary {
    /// Participants who have written a letter.
    #[must_use]
    pub fn active(&self) -> usize {
        self.all.len().saturating_sub(self.without_letters.len())
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Serialized access to a [`ParticipantStore`] plus an injected rng.
#[derive(Debug)]
pub struct SwapEngine<S, R> {
    store: RwLock<S>,
    rng: Mutex<R>,
}

impl SwapEngine<MemoryStore, StdRng> {
    /// An empty in-memory engine with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(MemoryStore::new(), StdRng::seed_from_u64(seed))
    }
}

impl<S: ParticipantStore, R: Rng> SwapEngine<S, R> {
    /// Wrap a store and a randomness source.
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store: RwLock::new(store),
            rng: Mutex::new(rng),
        }
    }

    /// Take the store back out of the engine.
    pub fn into_store(self) -> Result<S, SwapError> {
        self.store.into_inner().map_err(|_| poisoned())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, S>, SwapError> {
        self.store.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, S>, SwapError> {
        self.store.write().map_err(|_| poisoned())
    }

    fn rng(&self) -> Result<MutexGuard<'_, R>, SwapError> {
        self.rng.lock().map_err(|_| poisoned())
    }

    // -------------------------------------------------------------------------
    // Swap lifecycle
    // -------------------------------------------------------------------------

    /// Create the swap, starting in `JOIN`.
    pub fn create_swap(&self) -> Result<SwapRecord, SwapError> {
        let record = SwapRecord::new();
        self.write()?.apply(&[StoreOp::CreateSwap(record)])?;
        tracing::info!(period = %record.period, "swap created");
        Ok(record)
    }

    /// Period and headline counts.
    pub fn swap_info(&self) -> Result<SwapInfo, SwapError> {
        let store = self.read()?;
        let swap = store.swap()?.ok_or(SwapError::NoActiveSwap)?;
        let snapshot = Snapshot::load(&*store)?;
        Ok(SwapInfo {
            period: swap.period,
            participants: snapshot.len(),
            matched: snapshot.matched().count(),
            banned: snapshot.banned().count(),
        })
    }

    /// Move to the named period and report the deliveries it triggers.
    pub fn set_period(&self, requested: &str) -> Result<Transition, SwapError> {
        let mut store = self.write()?;
        let current = store.swap()?.ok_or(SwapError::NoActiveSwap)?.period;
        let snapshot = Snapshot::load(&*store)?;

        let transition = transition_period(current, requested, &snapshot)?;
        store.apply(&[StoreOp::SetPeriod(transition.to)])?;
        Ok(transition)
    }

    // -------------------------------------------------------------------------
    // Participant commands
    // -------------------------------------------------------------------------

    /// Enroll a participant, restoring the letter they had when they left.
    pub fn join(&self, id: ParticipantId, name: &str) -> Result<JoinOutcome, SwapError> {
        let name = validate_text("name", name, MAX_NAME_LENGTH)?;
        let mut store = self.write()?;
        if store.swap()?.is_none() {
            return Err(SwapError::NoActiveSwap);
        }
        if store.banned()?.contains(&id) {
            tracing::info!(participant = %id, "banned participant tried to join");
            return Err(SwapError::Banned(id));
        }

        let mut participant = Participant::new(id, name);
        let mut ops = Vec::with_capacity(2);
        let letter_restored = match store.departed_letter(id)? {
            Some(letter) => {
                participant = participant.with_letter(letter);
                true
            }
            None => false,
        };
        ops.push(StoreOp::Insert(participant.clone()));
        if letter_restored {
            ops.push(StoreOp::ForgetLetter(id));
        }

        store.apply(&ops)?;
        tracing::info!(
            participant = %id,
            name = %participant.name,
            letter_restored,
            "participant joined"
        );
        Ok(JoinOutcome {
            participant,
            letter_restored,
        })
    }

    /// Write or replace a participant's letter.
    pub fn set_letter(&self, id: ParticipantId, letter: &str) -> Result<(), SwapError> {
        let letter = validate_text("letter", letter, MAX_LETTER_LENGTH)?;
        self.update(MutationRecord {
            letter: Patch::Set(letter),
            ..MutationRecord::new(id)
        })?;
        tracing::info!(participant = %id, "letter set");
        Ok(())
    }

    /// Submit the gift for the participant's current giftee.
    pub fn set_gift(&self, id: ParticipantId, gift: &str) -> Result<(), SwapError> {
        let gift = validate_text("gift", gift, MAX_GIFT_LENGTH)?;
        let mut store = self.write()?;
        let snapshot = Snapshot::load(&*store)?;
        if snapshot.require(id)?.giftee.is_none() {
            return Err(SwapError::NotMatched(id));
        }

        store.apply(&[StoreOp::Update(MutationRecord {
            gift: Patch::Set(gift),
            ..MutationRecord::new(id)
        })])?;
        tracing::info!(participant = %id, "gift set");
        Ok(())
    }

    /// Mark (or unmark) a participant as done watching.
    pub fn set_done_watching(&self, id: ParticipantId, done: bool) -> Result<(), SwapError> {
        self.update(MutationRecord {
            done_watching: Some(done),
            ..MutationRecord::new(id)
        })?;
        tracing::info!(participant = %id, done, "done watching updated");
        Ok(())
    }

    /// Refresh a participant's display name.
    pub fn rename(&self, id: ParticipantId, name: &str) -> Result<(), SwapError> {
        let name = validate_text("name", name, MAX_NAME_LENGTH)?;
        self.update(MutationRecord {
            name: Some(name),
            ..MutationRecord::new(id)
        })
    }

    /// The letter of the participant's giftee.
    pub fn read_giftee_letter(&self, id: ParticipantId) -> Result<GifteeLetter, SwapError> {
        let snapshot = self.snapshot()?;
        let giftee_id = snapshot.require(id)?.giftee.ok_or(SwapError::NotMatched(id))?;
        let giftee = snapshot.require(giftee_id)?;
        let letter = giftee
            .letter
            .clone()
            .ok_or(SwapError::MissingLetter(giftee_id))?;
        Ok(GifteeLetter {
            giftee: giftee_id,
            name: giftee.name.clone(),
            letter,
        })
    }

    /// The gift the participant's santa submitted. Only available in `WATCH`.
    pub fn receive_gift(&self, id: ParticipantId) -> Result<ReceivedGift, SwapError> {
        let store = self.read()?;
        let period = current_period(&*store)?;
        if period != SwapPeriod::Watch {
            return Err(SwapError::GiftsNotDelivered(period));
        }
        let snapshot = Snapshot::load(&*store)?;
        let santa_id = snapshot.require(id)?.santa.ok_or(SwapError::NotMatched(id))?;
        let gift = snapshot
            .require(santa_id)?
            .gift
            .clone()
            .ok_or(SwapError::MissingGift(id))?;
        Ok(ReceivedGift {
            santa: santa_id,
            gift,
        })
    }

    /// Leave the swap, repairing the cycle around the participant.
    pub fn leave(&self, id: ParticipantId) -> Result<RemovalOutcome, SwapError> {
        let mut store = self.write()?;
        let snapshot = Snapshot::load(&*store)?;
        snapshot.require(id)?;
        let period = current_period(&*store)?;

        let outcome = removal(&snapshot, id, period, false)?;
        store.apply(&outcome.ops)?;
        tracing::info!(participant = %id, "participant left");
        Ok(outcome.result)
    }

    // -------------------------------------------------------------------------
    // Admin commands
    // -------------------------------------------------------------------------

    /// Ban an id, removing it from the swap if it joined.
    ///
    /// A participant without both edges is simply dropped from the pool.
    pub fn ban(&self, id: ParticipantId) -> Result<RemovalOutcome, SwapError> {
        let mut store = self.write()?;
        let snapshot = Snapshot::load(&*store)?;
        if snapshot.is_banned(id) {
            return Err(SwapError::Banned(id));
        }
        let period = current_period(&*store)?;

        let outcome = removal(&snapshot, id, period, true)?;
        store.apply(&outcome.ops)?;
        tracing::info!(participant = %id, joined = snapshot.contains(id), "participant banned");
        Ok(outcome.result)
    }

    /// Lift a ban. The id has to join again to take part.
    pub fn unban(&self, id: ParticipantId) -> Result<(), SwapError> {
        self.write()?.apply(&[StoreOp::Unban(id)])?;
        tracing::info!(participant = %id, "participant unbanned");
        Ok(())
    }

    /// Match every eligible participant.
    pub fn match_users(&self) -> Result<MatchOutcome, SwapError> {
        let mut store = self.write()?;
        if store.swap()?.is_none() {
            return Err(SwapError::NoActiveSwap);
        }
        let snapshot = Snapshot::load(&*store)?;

        let outcome = {
            let mut rng = self.rng()?;
            match_participants(&snapshot, &mut *rng).map_err(escalate)?
        };
        store.apply(&StoreOp::updates(&outcome.mutations))?;
        Ok(outcome)
    }

    /// Clear every giftee and santa edge. Letters and gifts are kept.
    pub fn unmatch_all(&self) -> Result<UnmatchOutcome, SwapError> {
        let mut store = self.write()?;
        let snapshot = Snapshot::load(&*store)?;

        let records: Vec<MutationRecord> = snapshot
            .participants()
            .filter(|p| !p.is_unmatched())
            .map(|p| MutationRecord {
                giftee: Patch::between(&p.giftee, &None),
                santa: Patch::between(&p.santa, &None),
                ..MutationRecord::new(p.id)
            })
            .collect();
        store.apply(&StoreOp::updates(&records))?;

        let unmatched: Vec<ParticipantId> = records.iter().map(|r| r.id).collect();
        tracing::warn!(count = unmatched.len(), "all participants unmatched");
        Ok(UnmatchOutcome { unmatched })
    }

    /// Render the assignment for an administrator.
    pub fn reveal(
        &self,
        format: RevealFormat,
        layout: GraphLayout,
        count: usize,
    ) -> Result<Reveal, SwapError> {
        let store = self.read()?;
        let snapshot = Snapshot::load(&*store)?;
        let mut rng = self.rng()?;
        reveal(&snapshot, format, layout, count, &mut *rng).map_err(escalate)
    }

    /// Administrator overview.
    pub fn summary(&self) -> Result<SwapSummary, SwapError> {
        let store = self.read()?;
        let period = store.swap()?.ok_or(SwapError::NoActiveSwap)?.period;
        let snapshot = Snapshot::load(&*store)?;

        let list = |keep: &dyn Fn(&Participant) -> bool| -> Vec<SummaryEntry> {
            snapshot
                .participants()
                .filter(|p| keep(*p))
                .map(|p| SummaryEntry {
                    id: p.id,
                    name: p.name.clone(),
                })
                .collect()
        };

        Ok(SwapSummary {
            period,
            all: list(&|_| true),
            without_letters: list(&|p| !p.has_letter()),
            without_gifts: list(&|p| p.has_letter() && !p.has_gift()),
            not_done_watching: list(&|p| p.has_letter() && !p.done_watching),
            without_giftees: list(&|p| p.has_letter() && p.giftee.is_none()),
            without_santas: list(&|p| p.has_letter() && p.santa.is_none()),
            banned: snapshot
                .banned()
                .map(|id| SummaryEntry {
                    id,
                    name: snapshot.name_of(id),
                })
                .collect(),
        })
    }

    /// Decompose the assignment and check it covers every matched participant.
    pub fn cycles(&self) -> Result<Vec<Cycle>, SwapError> {
        let snapshot = self.snapshot()?;
        let check = || -> Result<Vec<Cycle>, SwapError> {
            let graph = AssignmentGraph::from_snapshot(&snapshot)?;
            let cycles = decompose(&graph)?;
            verify_cover(&graph, &cycles)?;
            Ok(cycles)
        };
        check().map_err(escalate)
    }

    // -------------------------------------------------------------------------
    // Raw views
    // -------------------------------------------------------------------------

    /// A consistent point-in-time view of the participants.
    pub fn snapshot(&self) -> Result<Snapshot, SwapError> {
        Snapshot::load(&*self.read()?)
    }

    /// The full store contents for backups.
    pub fn export(&self) -> Result<SwapSnapshot, SwapError> {
        SwapSnapshot::export(&*self.read()?)
    }

    fn update(&self, record: MutationRecord) -> Result<(), SwapError> {
        self.write()?.apply(&[StoreOp::Update(record)])
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn poisoned() -> SwapError {
    SwapError::StorageError("engine lock poisoned".to_string())
}

/// Log integrity failures loudly; pass every error through unchanged.
fn escalate(e: SwapError) -> SwapError {
    if e.is_integrity_failure() {
        tracing::error!(error = %e, "assignment integrity failure");
    }
    e
}

fn current_period<S: ParticipantStore + ?Sized>(store: &S) -> Result<SwapPeriod, SwapError> {
    Ok(store.swap()?.map(|s| s.period).unwrap_or_default())
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<String, SwapError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SwapError::InvalidInput(format!("{field} must not be empty")));
    }
    if value.len() > max {
        return Err(SwapError::InvalidInput(format!(
            "{field} is {} bytes, the limit is {max}",
            value.len()
        )));
    }
    Ok(value.to_string())
}

struct Removal {
    ops: Vec<StoreOp>,
    result: RemovalOutcome,
}

/// Ops that take `id` out of the swap, repairing its cycle if needed.
fn removal(
    snapshot: &Snapshot,
    id: ParticipantId,
    period: SwapPeriod,
    ban: bool,
) -> Result<Removal, SwapError> {
    let mut ops = Vec::new();
    let mut repair = None;
    let mut notifications = Vec::new();

    if snapshot.contains(id) {
        match remove_participant(snapshot, id) {
            Ok(outcome) => {
                ops.extend(StoreOp::updates(&outcome.mutations));
                notifications = repair_notifications(&outcome);
                repair = Some(outcome.repair);
            }
            Err(SwapError::NotFullyMatched(_)) => {
                if period != SwapPeriod::Join {
                    tracing::warn!(
                        participant = %id,
                        period = %period,
                        "removed participant had no santa and giftee, no connections rerouted"
                    );
                }
            }
            Err(e) => return Err(escalate(e)),
        }
        if let Some(letter) = snapshot.get(id).and_then(|p| p.letter.clone()) {
            ops.push(StoreOp::KeepLetter(id, letter));
        }
        ops.push(StoreOp::Delete(id));
    }
    if ban {
        ops.push(StoreOp::Ban(id));
    }

    Ok(Removal {
        ops,
        result: RemovalOutcome {
            removed: id,
            banned: ban,
            repair,
            notifications,
        },
    })
}

// =============================================================================
// TESTS
// =============================================================================
