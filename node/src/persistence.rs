// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use wipecert_kernel::snapshot::blake3::{hash_bytes, hash_state_blake3};
use wipecert_kernel::snapshot::encode::encode_state;
use wipecert_kernel::state::kernel::RegistryState;
use wipecert_persistence::snapshot::{encode_snapshot, SnapshotHeader};

use crate::errors::EngineError;

/// Outcome of a snapshot write.
#[derive(Debug, Clone)]
pub struct SavedSnapshot {
    pub path: PathBuf,
    /// BLAKE3 of the whole container as written.
    pub hash: [u8; 32],
    pub size: u64,
    pub event_height: u64,
}

pub struct SnapshotManager;

impl SnapshotManager {
    /// Writes `state` to `path` atomically.
    ///
    /// The container goes to `*.tmp` first and is fsync'd; an existing snapshot is kept
    /// as `*.bin.prev` before the rename.
    pub fn save(path: &Path, state: &RegistryState, timestamp: u64) -> Result<SavedSnapshot, EngineError> {
        let body = encode_state(state)?;

        let mut hash_prefix = [0u8; 16];
        hash_prefix.copy_from_slice(&hash_state_blake3(state)[..16]);
        let header = SnapshotHeader::new(state.version(), timestamp, hash_prefix);
        let container = encode_snapshot(&header, &body);

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&container)?;
            file.sync_all()?;
        }

        // ROTATION LOGIC: Keep one previous version
        if path.exists() {
            let prev_path = path.with_extension("bin.prev");
            if let Err(e) = std::fs::rename(path, &prev_path) {
                tracing::warn!("Could not rotate previous snapshot to {:?}: {}", prev_path, e);
            }
        }

        std::fs::rename(&tmp_path, path)?;

        let size = container.len() as u64;
        metrics::gauge!("wipecert_snapshot_size_bytes", size as f64);

        Ok(SavedSnapshot {
            path: path.to_path_buf(),
            hash: hash_bytes(&container),
            size,
            event_height: header.event_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wipecert_kernel::event::RegistryEvent;
    use wipecert_kernel::types::id::Principal;
    use wipecert_persistence::snapshot::read_header;

    fn initialized() -> RegistryState {
        let mut state = RegistryState::new();
        state
            .apply_event(&RegistryEvent::Initialized { owner: Principal::from("0xOWNER") })
            .unwrap();
        state
    }

    #[test]
    fn test_save_writes_header_and_rotates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.bin");
        let state = initialized();

        let first = SnapshotManager::save(&path, &state, 100).unwrap();
        assert_eq!(first.event_height, 1);
        assert_eq!(first.size, std::fs::metadata(&path).unwrap().len());

        let header = read_header(&path).unwrap();
        assert_eq!(header.timestamp, 100);
        assert_eq!(header.state_hash[..], hash_state_blake3(&state)[..16]);

        let second = SnapshotManager::save(&path, &state, 200).unwrap();
        assert!(dir.path().join("snapshot.bin.prev").exists());
        assert!(!dir.path().join("snapshot.tmp").exists());
        assert_ne!(first.hash, second.hash);
    }
}
