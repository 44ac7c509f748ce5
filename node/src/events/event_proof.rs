// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Proof - Audit Trail Generation
//!
//! Builds a `RegistryProof` from the live state and the files backing it.
//!
//! # Guarantee
//! Same events → Same proof (across any architecture)

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use wipecert_kernel::proof::RegistryProof;
use wipecert_kernel::snapshot::blake3::hash_state_blake3;
use wipecert_kernel::state::kernel::RegistryState;

/// BLAKE3 hash of the first `len` bytes of the event log file (header + committed frames).
///
/// The log only grows, so the prefix stays stable while later events are appended.
pub fn compute_event_log_hash(path: impl AsRef<Path>, len: u64) -> std::io::Result<[u8; 32]> {
    let mut file = File::open(path)?.take(len);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// What a proof is built from, captured while the engine is locked.
///
/// Hashing the log file happens in `generate`, which needs no lock.
#[derive(Debug, Clone)]
pub struct ProofInputs {
    pub final_state_hash: [u8; 32],
    pub snapshot_hash: Option<[u8; 32]>,
    /// Log file and its committed length; `None` for an in-memory log.
    pub event_log: Option<(PathBuf, u64)>,
    pub event_count: u64,
}

impl ProofInputs {
    pub fn capture(
        state: &RegistryState,
        snapshot_hash: Option<[u8; 32]>,
        event_log: Option<(PathBuf, u64)>,
        event_count: u64,
    ) -> Self {
        Self {
            final_state_hash: hash_state_blake3(state),
            snapshot_hash,
            event_log,
            event_count,
        }
    }

    /// Builds the proof. A node without a log file reports a zero log hash, one
    /// without a snapshot a zero snapshot hash.
    pub fn generate(self) -> std::io::Result<RegistryProof> {
        let event_log_hash = match &self.event_log {
            Some((path, len)) => compute_event_log_hash(path, *len)?,
            None => [0u8; 32],
        };

        Ok(RegistryProof::new(
            event_log_hash,
            self.snapshot_hash.unwrap_or([0u8; 32]),
            self.final_state_hash,
            self.event_count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wipecert_persistence::fixtures::generate_test_scenario;
    use wipecert_kernel::replay::replay_events;
    use wipecert_kernel::snapshot::blake3::hash_bytes;
    use wipecert_persistence::log::{encode_event, encode_frame, read_log};

    #[test]
    fn test_proof_is_reproducible() {
        let dir = tempdir().unwrap();
        let paths = generate_test_scenario(dir.path(), 3).unwrap();
        let scan = read_log(&paths.log).unwrap();
        let state = replay_events(&scan.events).unwrap();
        let log = Some((paths.log.clone(), scan.valid_len));

        let with_snapshot = ProofInputs::capture(&state, Some([7u8; 32]), log.clone(), scan.height())
            .generate()
            .unwrap();
        let without_snapshot = ProofInputs::capture(&state, None, log, scan.height())
            .generate()
            .unwrap();

        assert_eq!(with_snapshot.snapshot_hash, [7u8; 32]);
        assert_eq!(without_snapshot.snapshot_hash, [0u8; 32]);
        assert!(with_snapshot.matches(&without_snapshot));
        assert_eq!(with_snapshot.event_log_hash, hash_bytes(&std::fs::read(&paths.log).unwrap()));
        assert_eq!(with_snapshot.event_count, 6);
    }

    #[test]
    fn test_log_hash_ignores_bytes_past_committed_length() {
        let dir = tempdir().unwrap();
        let paths = generate_test_scenario(dir.path(), 3).unwrap();
        let scan = read_log(&paths.log).unwrap();
        let before = compute_event_log_hash(&paths.log, scan.valid_len).unwrap();

        // A frame appended after the inputs were captured.
        let extra = encode_frame(scan.height(), &encode_event(&scan.events[2]).unwrap());
        let mut bytes = std::fs::read(&paths.log).unwrap();
        bytes.extend_from_slice(&extra);
        std::fs::write(&paths.log, bytes).unwrap();

        assert_eq!(compute_event_log_hash(&paths.log, scan.valid_len).unwrap(), before);
        assert_ne!(compute_event_log_hash(&paths.log, u64::MAX).unwrap(), before);
    }

    #[test]
    fn test_proof_serialization() {
        let proof = RegistryProof::new([2u8; 32], [1u8; 32], [3u8; 32], 100);
        let json = serde_json::to_string(&proof).unwrap();
        let decoded: RegistryProof = serde_json::from_str(&json).unwrap();
        assert_eq!(proof, decoded);
    }
}
