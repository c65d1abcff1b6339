//! # Formats
//!
//! Serialized forms of a whole swap. File I/O lives in the app layer.

pub mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, SnapshotHeader, SwapSnapshot, snapshot_from_bytes,
    snapshot_to_bytes,
};
