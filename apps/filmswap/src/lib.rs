//! # filmswap
//!
//! Command layer around the filmswap assignment engine: a CLI, an HTTP API
//! for participants and administrators, TOML configuration and JSON backups.

pub mod api;
pub mod backup;
pub mod cli;
pub mod config;
pub mod deliver;

use crate::config::{Backend, Settings};
use filmswap_core::{MemoryStore, RedbStore, StorageBackend, SwapEngine, SwapError};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// The engine as deployed: runtime-selected store, entropy-seeded rng.
pub type Engine = SwapEngine<StorageBackend, StdRng>;

/// Open the configured store and wrap it in an engine.
pub fn open_engine(settings: &Settings) -> Result<Engine, SwapError> {
    let backend = match settings.backend {
        Backend::Redb => StorageBackend::Persistent(RedbStore::open(&settings.database)?),
        Backend::Memory => {
            tracing::warn!("memory backend selected, nothing will be persisted");
            StorageBackend::InMemory(MemoryStore::new())
        }
    };
    Ok(SwapEngine::new(backend, StdRng::from_entropy()))
}
