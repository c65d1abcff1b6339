//! # Backups
//!
//! JSON backups are written to `backup_dir` as `filmswap-<unix-ts>.json`.
//! The binary form (`filmswap-<unix-ts>.fswp`) is the core snapshot format.
//! [`read_backup`] accepts either and tells them apart by the magic bytes.

use filmswap_core::primitives::MAGIC_BYTES;
use filmswap_core::{
    AssignmentGraph, ParticipantStore, SwapError, SwapSnapshot, snapshot_from_bytes,
    snapshot_to_bytes,
};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest backup file [`read_backup`] will load (64 MB).
pub const MAX_BACKUP_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Encoding of a backup file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Json,
    Binary,
}

impl BackupFormat {
    fn extension(self) -> &'static str {
        match self {
            BackupFormat::Json => "json",
            BackupFormat::Binary => "fswp",
        }
    }
}

/// `filmswap-<ts>.<ext>`.
#[must_use]
pub fn backup_file_name(timestamp: u64, format: BackupFormat) -> String {
    format!("filmswap-{}.{}", timestamp, format.extension())
}

/// Write `snapshot` into `dir`, creating it if needed. Returns the file path.
pub fn write_backup(
    snapshot: &SwapSnapshot,
    dir: &Path,
    format: BackupFormat,
) -> Result<PathBuf, SwapError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| SwapError::IoError(format!("Create {}: {}", dir.display(), e)))?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let path = dir.join(backup_file_name(timestamp, format));

    let data = match format {
        BackupFormat::Json => serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SwapError::SerializationError(e.to_string()))?,
        BackupFormat::Binary => snapshot_to_bytes(snapshot)?,
    };
    std::fs::write(&path, data)
        .map_err(|e| SwapError::IoError(format!("Write {}: {}", path.display(), e)))?;

    tracing::info!(
        path = %path.display(),
        participants = snapshot.participants.len(),
        "backup written"
    );
    Ok(path)
}

/// Read a JSON or binary backup.
pub fn read_backup(path: &Path) -> Result<SwapSnapshot, SwapError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SwapError::IoError(format!("Cannot read {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(SwapError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_BACKUP_FILE_SIZE {
        return Err(SwapError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_BACKUP_FILE_SIZE
        )));
    }

    let data = std::fs::read(path)
        .map_err(|e| SwapError::IoError(format!("Read {}: {}", path.display(), e)))?;
    if data.starts_with(MAGIC_BYTES) {
        snapshot_from_bytes(&data)
    } else {
        serde_json::from_slice(&data).map_err(|e| SwapError::SerializationError(e.to_string()))
    }
}

/// Load a backup into an empty store in one batch.
///
/// The assignment is verified first; a corrupt backup is rejected with its
/// integrity error and nothing is written.
pub fn restore_into<S: ParticipantStore>(
    store: &mut S,
    snapshot: &SwapSnapshot,
) -> Result<(), SwapError> {
    if let Err(e) = AssignmentGraph::from_snapshot(&snapshot.to_snapshot()) {
        tracing::error!(error = %e, "backup holds an invalid assignment");
        return Err(e);
    }
    store.apply(&snapshot.restore_ops())?;
    tracing::info!(
        participants = snapshot.participants.len(),
        banned = snapshot.banned.len(),
        "backup restored"
    );
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use filmswap_core::{MemoryStore, Participant, ParticipantId, SwapRecord};

    fn sample() -> SwapSnapshot {
        let mut alice = Participant::new(ParticipantId(1), "alice").with_letter("noir");
        alice.giftee = Some(ParticipantId(2));
        alice.santa = Some(ParticipantId(2));
        let mut bob = Participant::new(ParticipantId(2), "bob").with_letter("musicals");
        bob.giftee = Some(ParticipantId(1));
        bob.santa = Some(ParticipantId(1));
        SwapSnapshot {
            swap: Some(SwapRecord::new()),
            participants: vec![alice, bob],
            banned: vec![ParticipantId(9)],
        }
    }

    #[test]
    fn file_name_format() {
        assert_eq!(
            backup_file_name(1_700_000_000, BackupFormat::Json),
            "filmswap-1700000000.json"
        );
        assert_eq!(
            backup_file_name(1_700_000_000, BackupFormat::Binary),
            "filmswap-1700000000.fswp"
        );
    }

    #[test]
    fn json_and_binary_backups_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("nested");

        for format in [BackupFormat::Json, BackupFormat::Binary] {
            let path = write_backup(&sample(), &nested, format).expect("write");
            assert!(path.starts_with(&nested));
            assert_eq!(read_backup(&path).expect("read"), sample());
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("junk.json");
        std::fs::write(&path, b"{ not json").expect("write");
        assert!(matches!(
            read_backup(&path),
            Err(SwapError::SerializationError(_))
        ));
        assert!(matches!(read_backup(dir.path()), Err(SwapError::IoError(_))));
    }

    #[test]
    fn corrupt_assignment_is_not_restored() {
        let mut corrupt = sample();
        corrupt.participants[1].santa = Some(ParticipantId(7));

        let mut store = MemoryStore::new();
        let result = restore_into(&mut store, &corrupt);
        assert!(result.as_ref().is_err_and(SwapError::is_integrity_failure));
        assert_eq!(store, MemoryStore::new());
    }

    #[test]
    fn restore_rebuilds_store() {
        let mut store = MemoryStore::new();
        restore_into(&mut store, &sample()).expect("restore");
        assert_eq!(SwapSnapshot::export(&store).expect("export"), sample());

        // A second restore collides with the existing swap and changes nothing.
        assert!(restore_into(&mut store, &sample()).is_err());
        assert_eq!(SwapSnapshot::export(&store).expect("export"), sample());
    }
}
