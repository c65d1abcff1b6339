//! # Notifications
//!
//! Side effects the engine reports but never performs. The command layer
//! delivers them (DM, log line, HTTP response) after the mutation set has
//! been durably applied.

use crate::repair::{Repair, RepairOutcome};
use crate::ParticipantId;
use serde::{Deserialize, Serialize};

/// A message owed to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Send the giftee's letter to their santa.
    GifteeLetter {
        recipient: ParticipantId,
        giftee: ParticipantId,
        letter: String,
    },
    /// The giftee has no letter; delivery skipped.
    LetterMissing {
        recipient: ParticipantId,
        giftee: ParticipantId,
    },
    /// Send the santa's gift to its recipient.
    Gift {
        recipient: ParticipantId,
        santa: ParticipantId,
        gift: String,
    },
    /// The santa has not submitted a gift; delivery skipped.
    GiftMissing {
        recipient: ParticipantId,
        santa: ParticipantId,
    },
    /// The recipient's giftee was removed and replaced.
    GifteeChanged { recipient: ParticipantId },
    /// The recipient's santa was removed and replaced.
    SantaChanged { recipient: ParticipantId },
    /// The recipient's only partner was removed; they are unmatched now.
    Unmatched { recipient: ParticipantId },
}

impl Notification {
    /// Who the notification is for.
    #[must_use]
    pub fn recipient(&self) -> ParticipantId {
        match self {
            Notification::GifteeLetter { recipient, .. }
            | Notification::LetterMissing { recipient, .. }
            | Notification::Gift { recipient, .. }
            | Notification::GiftMissing { recipient, .. }
            | Notification::GifteeChanged { recipient }
            | Notification::SantaChanged { recipient }
            | Notification::Unmatched { recipient } => *recipient,
        }
    }

    /// The delivery was skipped and should be reported, not sent.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Notification::LetterMissing { .. } | Notification::GiftMissing { .. }
        )
    }

    /// Message text for the recipient.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Notification::GifteeLetter { letter, .. } => {
                format!("Here is your giftee's letter:\n\n{letter}")
            }
            Notification::LetterMissing { giftee, .. } => {
                format!("Could not send a letter: giftee {giftee} has not written one")
            }
            Notification::Gift { gift, .. } => format!("Your santa sent you a gift:\n\n{gift}"),
            Notification::GiftMissing { santa, .. } => {
                format!("Could not send a gift: santa {santa} has not submitted one")
            }
            Notification::GifteeChanged { .. } => "Your giftee was removed from the swap. \
                You have been assigned a new giftee. Please read your giftee's letter again, \
                and send them a gift."
                .to_string(),
            Notification::SantaChanged { .. } => "Your santa was removed from the swap. \
                You will receive your gift shortly, but it might be after the watch period starts."
                .to_string(),
            Notification::Unmatched { .. } => "Your giftee left the swap and there is nobody \
                left to pair you with. You will be matched again when someone new joins."
                .to_string(),
        }
    }
}

/// Who must hear about a repair.
#[must_use]
pub fn repair_notifications(outcome: &RepairOutcome) -> Vec<Notification> {
    match outcome.repair {
        Repair::Rerouted { santa, giftee } => vec![
            Notification::GifteeChanged { recipient: santa },
            Notification::SantaChanged { recipient: giftee },
        ],
        Repair::Dissolved { partner } => vec![Notification::Unmatched { recipient: partner }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerouted_notifies_both_neighbours() {
        let outcome = RepairOutcome {
            removed: ParticipantId(2),
            repair: Repair::Rerouted {
                santa: ParticipantId(1),
                giftee: ParticipantId(3),
            },
            mutations: Vec::new(),
        };
        let recipients: Vec<_> = repair_notifications(&outcome)
            .iter()
            .map(Notification::recipient)
            .collect();
        assert_eq!(recipients, vec![ParticipantId(1), ParticipantId(3)]);
    }

    #[test]
    fn dissolved_notifies_partner_once() {
        let outcome = RepairOutcome {
            removed: ParticipantId(2),
            repair: Repair::Dissolved {
                partner: ParticipantId(1),
            },
            mutations: Vec::new(),
        };
        let notes = repair_notifications(&outcome);
        assert_eq!(notes, vec![Notification::Unmatched {
            recipient: ParticipantId(1)
        }]);
    }

    #[test]
    fn skipped_deliveries() {
        let missing = Notification::GiftMissing {
            recipient: ParticipantId(1),
            santa: ParticipantId(2),
        };
        assert!(missing.is_skipped());
        assert!(missing.message().contains('2'));
        assert!(!Notification::GifteeChanged {
            recipient: ParticipantId(1)
        }
        .is_skipped());
    }
}
