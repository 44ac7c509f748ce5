// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Replay - Authoritative Recovery
//!
//! **Event Log ALWAYS wins. Snapshot is just a cache.**
//!
//! # Invariants
//! - Corrupt frame or sequence gap in the log → fail closed
//! - Event the registry would have refused → fail closed
//! - Snapshot that fails its checksum, its state hash, or claims more events than
//!   the log holds → discarded, full replay instead
//! - replay(events) = original state

use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use wipecert_kernel::error::RegistryError;
use wipecert_kernel::event::RegistryEvent;
use wipecert_kernel::replay::{replay_onto, ReplayFailure};
use wipecert_kernel::snapshot::blake3::{hash_bytes, hash_state_blake3, to_hex};
use wipecert_kernel::snapshot::decode::decode_state;
use wipecert_kernel::state::kernel::RegistryState;
use wipecert_persistence::snapshot::{decode_snapshot, SnapshotHeader};
use wipecert_persistence::PersistenceError;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Event {index} rejected during replay: {error}")]
    EventApplication { index: u64, error: RegistryError },
}

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Applies `events` on top of `base`, whose state already covers the first
/// `base_height` events of the log.
pub fn replay_tail(base: RegistryState, base_height: u64, events: &[RegistryEvent]) -> Result<RegistryState> {
    let start = Instant::now();

    let state = replay_onto(base, events).map_err(|ReplayFailure { index, error }| {
        let index = base_height + index as u64;
        tracing::error!("Event replay failed at index {}: {}", index, error);
        ReplayError::EventApplication { index, error }
    })?;

    metrics::histogram!("wipecert_replay_duration_seconds", start.elapsed().as_secs_f64());
    tracing::info!(
        "Replayed {} events (from height {}). State hash: {}",
        events.len(),
        base_height,
        to_hex(&hash_state_blake3(&state)[..8])
    );
    Ok(state)
}

/// Replay a full log into a fresh state.
pub fn replay_events(events: &[RegistryEvent]) -> Result<RegistryState> {
    replay_tail(RegistryState::new(), 0, events)
}

/// Why a snapshot was not used.
#[derive(Debug)]
pub enum SnapshotRejection {
    Missing,
    Unreadable(PersistenceError),
    Undecodable(RegistryError),
    HashMismatch,
    HeightMismatch { snapshot: u64, state: u64 },
    AheadOfLog { snapshot: u64, log: u64 },
}

/// A snapshot that passed every check.
pub struct LoadedSnapshot {
    pub header: SnapshotHeader,
    pub state: RegistryState,
    /// BLAKE3 of the file as read.
    pub file_hash: [u8; 32],
}

/// Loads a snapshot and checks it against itself and against the log height.
pub fn load_snapshot(path: &Path, log_height: u64) -> std::result::Result<LoadedSnapshot, SnapshotRejection> {
    if !path.exists() {
        return Err(SnapshotRejection::Missing);
    }

    let bytes = std::fs::read(path).map_err(|e| SnapshotRejection::Unreadable(e.into()))?;
    let (header, body) = decode_snapshot(&bytes).map_err(SnapshotRejection::Unreadable)?;
    let state = decode_state(&body).map_err(SnapshotRejection::Undecodable)?;

    if hash_state_blake3(&state)[..16] != header.state_hash {
        return Err(SnapshotRejection::HashMismatch);
    }
    if state.version() != header.event_height {
        return Err(SnapshotRejection::HeightMismatch {
            snapshot: header.event_height,
            state: state.version(),
        });
    }
    if header.event_height > log_height {
        return Err(SnapshotRejection::AheadOfLog {
            snapshot: header.event_height,
            log: log_height,
        });
    }

    Ok(LoadedSnapshot {
        header,
        state,
        file_hash: hash_bytes(&bytes),
    })
}
