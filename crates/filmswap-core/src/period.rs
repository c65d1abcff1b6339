//! # Swap Period State Machine
//!
//! | Period | Meaning |
//! |--------|---------|
//! | JOIN   | Participants enroll and write letters; nobody is matched yet |
//! | SWAP   | Matching has run; participants read letters and submit gifts |
//! | WATCH  | Gifts are delivered; participants watch and mark themselves done |
//!
//! The period is a plain value owned by the store. Transitions are requested
//! by an administrator and return the deliveries they trigger; the engine
//! itself never sends anything.
//!
//! Periods do not gate matching or repair here. Which admin action is allowed
//! in which period is a command-layer policy.

use crate::notify::Notification;
use crate::{Snapshot, SwapError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The phase of the current swap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum SwapPeriod {
    /// Participants may enroll.
    #[default]
    Join,
    /// Letters are out, gifts are being prepared.
    Swap,
    /// Gifts are out, participants are watching.
    Watch,
}

impl SwapPeriod {
    /// Every period in lifecycle order.
    pub const ALL: [SwapPeriod; 3] = [SwapPeriod::Join, SwapPeriod::Swap, SwapPeriod::Watch];

    /// Upper-case period name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SwapPeriod::Join => "JOIN",
            SwapPeriod::Swap => "SWAP",
            SwapPeriod::Watch => "WATCH",
        }
    }

    /// The period that normally follows this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<SwapPeriod> {
        match self {
            SwapPeriod::Join => Some(SwapPeriod::Swap),
            SwapPeriod::Swap => Some(SwapPeriod::Watch),
            SwapPeriod::Watch => None,
        }
    }
}

impl std::fmt::Display for SwapPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SwapPeriod {
    type Err = SwapError;

    /// Case-insensitive: `join`, `Swap`, `WATCH` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        SwapPeriod::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SwapError::InvalidPeriod(trimmed.to_string()))
    }
}

/// A completed period change and the deliveries it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Period before the change.
    pub from: SwapPeriod,
    /// Period after the change.
    pub to: SwapPeriod,
    /// Deliveries owed because of the change, skipped ones included.
    pub notifications: Vec<Notification>,
}

/// Resolve a requested period name and compute the triggered deliveries.
///
/// Any recognized period may be requested from any period, including the
/// current one (which re-sends the deliveries).
///
/// # Errors
///
/// `InvalidPeriod` if `requested` names no period. Nothing changes.
pub fn transition_period(
    current: SwapPeriod,
    requested: &str,
    snapshot: &Snapshot,
) -> Result<Transition, SwapError> {
    let to: SwapPeriod = requested.parse()?;
    let notifications = deliveries(to, snapshot);

    let skipped = notifications.iter().filter(|n| n.is_skipped()).count();
    tracing::info!(
        from = %current,
        to = %to,
        deliveries = notifications.len() - skipped,
        skipped,
        "swap period changed"
    );

    Ok(Transition {
        from: current,
        to,
        notifications,
    })
}

/// Deliveries owed on entering `period`.
///
/// - `SWAP`: every matched participant receives their giftee's letter.
/// - `WATCH`: every matched participant receives their santa's gift; a
///   missing gift is reported as skipped, not as an error.
/// - `JOIN`: nothing.
#[must_use]
pub fn deliveries(period: SwapPeriod, snapshot: &Snapshot) -> Vec<Notification> {
    match period {
        SwapPeriod::Join => Vec::new(),
        SwapPeriod::Swap => snapshot
            .participants()
            .filter_map(|p| {
                let giftee = p.giftee?;
                let letter = snapshot.get(giftee).and_then(|g| g.letter.clone());
                Some(match letter {
                    Some(letter) => Notification::GifteeLetter {
                        recipient: p.id,
                        giftee,
                        letter,
                    },
                    None => Notification::LetterMissing {
                        recipient: p.id,
                        giftee,
                    },
                })
            })
            .collect(),
        SwapPeriod::Watch => snapshot
            .participants()
            .filter_map(|p| {
                let santa = p.santa?;
                let gift = snapshot.get(santa).and_then(|s| s.gift.clone());
                Some(match gift {
                    Some(gift) => Notification::Gift {
                        recipient: p.id,
                        santa,
                        gift,
                    },
                    None => {
                        tracing::warn!(recipient = %p.id, santa = %santa, "santa has not submitted a gift, skipping");
                        Notification::GiftMissing {
                            recipient: p.id,
                            santa,
                        }
                    }
                })
            })
            .collect(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Participant, ParticipantId};

    fn pair() -> Snapshot {
        let mut a = Participant::new(ParticipantId(1), "a").with_letter("a likes noir");
        let mut b = Participant::new(ParticipantId(2), "b").with_letter("b likes anime");
        a.giftee = Some(ParticipantId(2));
        a.santa = Some(ParticipantId(2));
        b.giftee = Some(ParticipantId(1));
        b.santa = Some(ParticipantId(1));
        a.gift = Some("Akira".to_string());
        Snapshot::new([a, b, Participant::new(ParticipantId(3), "late")], [])
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("join".parse::<SwapPeriod>().expect("join"), SwapPeriod::Join);
        assert_eq!(" Swap ".parse::<SwapPeriod>().expect("swap"), SwapPeriod::Swap);
        assert_eq!("WATCH".parse::<SwapPeriod>().expect("watch"), SwapPeriod::Watch);
    }

    #[test]
    fn unknown_period_is_invalid() {
        let result = transition_period(SwapPeriod::Join, "party", &pair());
        assert!(matches!(result, Err(SwapError::InvalidPeriod(name)) if name == "party"));
    }

    #[test]
    fn entering_swap_delivers_giftee_letters() {
        let transition = transition_period(SwapPeriod::Join, "swap", &pair()).expect("swap");
        assert_eq!(transition.to, SwapPeriod::Swap);
        assert_eq!(
            transition.notifications,
            vec![
                Notification::GifteeLetter {
                    recipient: ParticipantId(1),
                    giftee: ParticipantId(2),
                    letter: "b likes anime".to_string(),
                },
                Notification::GifteeLetter {
                    recipient: ParticipantId(2),
                    giftee: ParticipantId(1),
                    letter: "a likes noir".to_string(),
                },
            ]
        );
    }

    #[test]
    fn entering_watch_skips_missing_gifts() {
        let transition = transition_period(SwapPeriod::Swap, "watch", &pair()).expect("watch");
        assert_eq!(
            transition.notifications,
            vec![
                Notification::GiftMissing {
                    recipient: ParticipantId(1),
                    santa: ParticipantId(2),
                },
                Notification::Gift {
                    recipient: ParticipantId(2),
                    santa: ParticipantId(1),
                    gift: "Akira".to_string(),
                },
            ]
        );
    }

    #[test]
    fn entering_join_delivers_nothing() {
        let transition = transition_period(SwapPeriod::Watch, "join", &pair()).expect("join");
        assert!(transition.notifications.is_empty());
    }

    #[test]
    fn lifecycle_order() {
        assert_eq!(SwapPeriod::default(), SwapPeriod::Join);
        assert_eq!(SwapPeriod::Join.next(), Some(SwapPeriod::Swap));
        assert_eq!(SwapPeriod::Watch.next(), None);
        assert_eq!(SwapPeriod::Watch.to_string(), "WATCH");
    }
}
