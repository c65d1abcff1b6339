//! # redb-backed Participant Store
//!
//! A disk-backed store using the redb embedded database.
//!
//! Every [`apply`](ParticipantStore::apply) runs in a single write
//! transaction. The transaction is aborted on the first failing op, so a
//! rejected batch leaves the database untouched.

use super::{ParticipantStore, StoreOp, SwapRecord};
use crate::{Participant, ParticipantId, SwapError};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;

/// Table for participants: ParticipantId(u64) -> postcard-encoded Participant
const PARTICIPANTS: TableDefinition<u64, &[u8]> = TableDefinition::new("participants");

/// Table for the banned set: ParticipantId(u64) -> ()
const BANNED: TableDefinition<u64, ()> = TableDefinition::new("banned");

/// Table for letters of departed participants: ParticipantId(u64) -> letter
const DEPARTED: TableDefinition<u64, &str> = TableDefinition::new("departed_letters");

/// Table for the swap record: key -> postcard-encoded SwapRecord
const SWAP: TableDefinition<&str, &[u8]> = TableDefinition::new("swap");

/// The only key of the swap table.
const CURRENT_SWAP: &str = "current";

/// A disk-backed participant store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SwapError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| SwapError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        let write_txn = db
            .begin_write()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        {
            write_txn
                .open_table(PARTICIPANTS)
                .map_err(|e| SwapError::StorageError(e.to_string()))?;
            write_txn
                .open_table(BANNED)
                .map_err(|e| SwapError::StorageError(e.to_string()))?;
            write_txn
                .open_table(DEPARTED)
                .map_err(|e| SwapError::StorageError(e.to_string()))?;
            write_txn
                .open_table(SWAP)
                .map_err(|e| SwapError::StorageError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        Ok(Self { db })
    }

    /// Number of stored participants.
    pub fn participant_count(&self) -> Result<u64, SwapError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(PARTICIPANTS)
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        table
            .len()
            .map_err(|e| SwapError::StorageError(e.to_string()))
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), SwapError> {
        self.db
            .compact()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SwapError> {
    postcard::to_allocvec(value).map_err(|e| SwapError::SerializationError(e.to_string()))
}

fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, SwapError> {
    postcard::from_bytes(bytes).map_err(|e| SwapError::SerializationError(e.to_string()))
}

/// Apply every op inside `write_txn`. The caller commits or aborts.
fn write_ops(write_txn: &WriteTransaction, ops: &[StoreOp]) -> Result<(), SwapError> {
    let mut participants = write_txn
        .open_table(PARTICIPANTS)
        .map_err(|e| SwapError::StorageError(e.to_string()))?;
    let mut banned = write_txn
        .open_table(BANNED)
        .map_err(|e| SwapError::StorageError(e.to_string()))?;
    let mut departed = write_txn
        .open_table(DEPARTED)
        .map_err(|e| SwapError::StorageError(e.to_string()))?;
    let mut swap = write_txn
        .open_table(SWAP)
        .map_err(|e| SwapError::StorageError(e.to_string()))?;

    for op in ops {
        match op {
            StoreOp::CreateSwap(record) => {
                let exists = swap
                    .get(CURRENT_SWAP)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .is_some();
                if exists {
                    return Err(SwapError::SwapAlreadyExists);
                }
                swap.insert(CURRENT_SWAP, encode(record)?.as_slice())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::SetPeriod(period) => {
                let mut record: SwapRecord = swap
                    .get(CURRENT_SWAP)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .map(|data| decode(data.value()))
                    .transpose()?
                    .ok_or(SwapError::NoActiveSwap)?;
                record.period = *period;
                swap.insert(CURRENT_SWAP, encode(&record)?.as_slice())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::Insert(participant) => {
                let exists = participants
                    .get(participant.id.0)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .is_some();
                if exists {
                    return Err(SwapError::AlreadyJoined(participant.id));
                }
                participants
                    .insert(participant.id.0, encode(participant)?.as_slice())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::Update(record) => {
                // Read-modify-write within the same transaction.
                let mut participant: Participant = participants
                    .get(record.id.0)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .map(|data| decode(data.value()))
                    .transpose()?
                    .ok_or(SwapError::UnknownParticipant(record.id))?;
                record.apply_to(&mut participant);
                participants
                    .insert(record.id.0, encode(&participant)?.as_slice())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::Delete(id) => {
                let removed = participants
                    .remove(id.0)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .is_some();
                if !removed {
                    return Err(SwapError::UnknownParticipant(*id));
                }
            }
            StoreOp::Ban(id) => {
                banned
                    .insert(id.0, ())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::Unban(id) => {
                let removed = banned
                    .remove(id.0)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?
                    .is_some();
                if !removed {
                    return Err(SwapError::NotBanned(*id));
                }
            }
            StoreOp::KeepLetter(id, letter) => {
                departed
                    .insert(id.0, letter.as_str())
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
            StoreOp::ForgetLetter(id) => {
                departed
                    .remove(id.0)
                    .map_err(|e| SwapError::StorageError(e.to_string()))?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// PARTICIPANTSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl ParticipantStore for RedbStore {
    fn participants(&self) -> Result<Vec<Participant>, SwapError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(PARTICIPANTS)
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        let mut participants = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| SwapError::StorageError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| SwapError::StorageError(e.to_string()))?;
            participants.push(decode(value.value())?);
        }
        Ok(participants)
    }

    fn banned(&self) -> Result<Vec<ParticipantId>, SwapError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(BANNED)
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        let mut banned = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| SwapError::StorageError(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| SwapError::StorageError(e.to_string()))?;
            banned.push(ParticipantId(key.value()));
        }
        Ok(banned)
    }

    fn swap(&self) -> Result<Option<SwapRecord>, SwapError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(SWAP)
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        match table
            .get(CURRENT_SWAP)
            .map_err(|e| SwapError::StorageError(e.to_string()))?
        {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn departed_letter(&self, id: ParticipantId) -> Result<Option<String>, SwapError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(DEPARTED)
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        Ok(table
            .get(id.0)
            .map_err(|e| SwapError::StorageError(e.to_string()))?
            .map(|data| data.value().to_string()))
    }

    fn apply(&mut self, ops: &[StoreOp]) -> Result<(), SwapError> {
        if ops.is_empty() {
            return Ok(());
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| SwapError::StorageError(e.to_string()))?;

        match write_ops(&write_txn, ops) {
            Ok(()) => write_txn
                .commit()
                .map_err(|e| SwapError::StorageError(e.to_string())),
            Err(e) => {
                write_txn
                    .abort()
                    .map_err(|abort| SwapError::StorageError(abort.to_string()))?;
                Err(e)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
