//! # Engine Primitives
//!
//! Hardcoded runtime constants for the swap engine.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Minimum pool size for a fresh derangement.
///
/// A derangement of a single participant does not exist, so the first
/// matching run needs at least two eligible participants.
pub const MIN_MATCH_POOL: usize = 2;

/// Number of shuffle-and-reject rounds before falling back to a single cycle.
///
/// A random shuffle is a derangement with probability ~1/e, so 64 rounds
/// fail with probability below 1e-12.
pub const MAX_DERANGEMENT_ATTEMPTS: usize = 64;

/// Magic bytes for the binary snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"FSWP";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a display name, in bytes.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length of a letter, in bytes.
///
/// Matches the message length limit of the chat platform letters arrive from.
pub const MAX_LETTER_LENGTH: usize = 4000;

/// Maximum length of a gift, in bytes.
pub const MAX_GIFT_LENGTH: usize = 4000;

/// Maximum number of graphs rendered by a single reveal.
pub const MAX_REVEAL_COUNT: usize = 10;
