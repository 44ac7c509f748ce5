// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Crash Recovery
//!
//! The event log is canonical truth. A snapshot only shortens replay: it is used when it
//! validates and covers a prefix of the log, and discarded with a warning otherwise.

use std::path::Path;

use wipecert_kernel::snapshot::blake3::to_hex;
use wipecert_kernel::state::kernel::RegistryState;

use crate::errors::EngineError;
use crate::events::event_replay::{load_snapshot, replay_events, replay_tail, SnapshotRejection};
use crate::events::{EventJournal, EventLog};

/// Everything the engine needs to resume serving.
pub struct Recovered {
    pub event_log: EventLog,
    pub journal: EventJournal,
    pub state: RegistryState,
    /// BLAKE3 of the snapshot file used to shorten replay, if one was.
    pub snapshot_hash: Option<[u8; 32]>,
}

impl Recovered {
    /// Fresh in-memory ledger.
    pub fn in_memory() -> Self {
        Self {
            event_log: EventLog::in_memory(),
            journal: EventJournal::new(),
            state: RegistryState::new(),
            snapshot_hash: None,
        }
    }
}

/// Rebuilds the registry from `event_log_path`, using `snapshot_path` when it is trustworthy.
pub fn recover(event_log_path: &Path, snapshot_path: Option<&Path>) -> Result<Recovered, EngineError> {
    tracing::info!("Recovering from event log: {:?}", event_log_path);

    let (event_log, scan) = EventLog::open(event_log_path)?;
    let log_height = scan.height();

    let mut snapshot_hash = None;
    let state = match snapshot_path.map(|path| (path, load_snapshot(path, log_height))) {
        Some((path, Ok(loaded))) => {
            let height = loaded.header.event_height;
            tracing::info!("Snapshot {:?} covers {} of {} events, replaying tail", path, height, log_height);
            snapshot_hash = Some(loaded.file_hash);
            replay_tail(loaded.state, height, &scan.events[height as usize..])
        }
        Some((path, Err(rejection))) => {
            log_rejection(path, &rejection);
            replay_events(&scan.events)
        }
        None => replay_events(&scan.events),
    }
    .map_err(|e| EngineError::Recovery(e.to_string()))?;

    if let Some(hash) = snapshot_hash {
        tracing::debug!("Snapshot hash: {}", to_hex(&hash[..16]));
    }

    Ok(Recovered {
        event_log,
        journal: EventJournal::from_committed(scan.events),
        state,
        snapshot_hash,
    })
}

fn log_rejection(path: &Path, rejection: &SnapshotRejection) {
    match rejection {
        SnapshotRejection::Missing => tracing::debug!("No snapshot at {:?}, full replay", path),
        other => tracing::warn!(
            "Snapshot {:?} discarded ({:?}). Replaying full event log.",
            path,
            other
        ),
    }
}
