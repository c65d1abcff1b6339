//! # Snapshot Persistence Format
//!
//! Binary export of a whole swap: swap record, participants, banned set.
//!
//! Format: Header (5 bytes) + postcard-serialized [`SwapSnapshot`].
//! - 4 bytes: Magic ("FSWP")
//! - 1 byte: Version
//!
//! The payload size and header are validated before any decoding.
//! The same [`SwapSnapshot`] value is what JSON backups contain.

use crate::store::{MemoryStore, ParticipantStore, StoreOp, SwapRecord};
use crate::{Participant, ParticipantId, Snapshot, SwapError, primitives};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted size of an encoded snapshot.
///
/// Checked before decoding. A swap of a few hundred participants with long
/// letters stays far below this.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every binary snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), SwapError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(SwapError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(SwapError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SwapError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(SwapError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SWAP SNAPSHOT
// =============================================================================

/// Everything a store holds, in a serializable, ordered form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSnapshot {
    /// The swap record, if a swap was created.
    pub swap: Option<SwapRecord>,
    /// Participants in ascending id order.
    pub participants: Vec<Participant>,
    /// Banned ids in ascending order.
    pub banned: Vec<ParticipantId>,
}

impl SwapSnapshot {
    /// Read the full contents of a store.
    pub fn export<S: ParticipantStore + ?Sized>(store: &S) -> Result<Self, SwapError> {
        Ok(Self {
            swap: store.swap()?,
            participants: store.participants()?,
            banned: store.banned()?,
        })
    }

    /// Ops that recreate this snapshot in an empty store.
    #[must_use]
    pub fn restore_ops(&self) -> Vec<StoreOp> {
        self.swap
            .map(StoreOp::CreateSwap)
            .into_iter()
            .chain(self.participants.iter().cloned().map(StoreOp::Insert))
            .chain(self.banned.iter().copied().map(StoreOp::Ban))
            .collect()
    }

    /// Load into a fresh in-memory store.
    #[must_use]
    pub fn into_store(self) -> MemoryStore {
        MemoryStore::from_parts(self.swap, self.participants, self.banned)
    }

    /// Engine view of the participants and banned set.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::new(self.participants.iter().cloned(), self.banned.iter().copied())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode a snapshot (header + payload).
pub fn snapshot_to_bytes(snapshot: &SwapSnapshot) -> Result<Vec<u8>, SwapError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| SwapError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a snapshot, validating size and header first.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<SwapSnapshot, SwapError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(SwapError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        SwapError::SerializationError(format!("Failed to deserialize snapshot: {e}"))
    })
}

// =============================================================================
// TESTS
// =============================================================================
