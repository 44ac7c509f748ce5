// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry Proof Structures.

use serde::{Deserialize, Serialize};

use crate::config::KERNEL_VERSION;

/// A receipt binding an event log to the registry state it replays into.
///
/// Two registries that agree on `event_log_hash`, `final_state_hash` and `event_count`
/// serve identical answers to every read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryProof {
    /// Version of the event language.
    pub kernel_version: u32,

    /// BLAKE3 hash of the event log file (header + frames).
    pub event_log_hash: [u8; 32],

    /// BLAKE3 hash of the last saved snapshot container, zero when none.
    pub snapshot_hash: [u8; 32],

    /// Canonical BLAKE3 hash of the registry state after replay.
    pub final_state_hash: [u8; 32],

    /// Number of committed events.
    pub event_count: u64,
}

impl RegistryProof {
    pub fn new(event_log_hash: [u8; 32], snapshot_hash: [u8; 32], final_state_hash: [u8; 32], event_count: u64) -> Self {
        Self {
            kernel_version: KERNEL_VERSION,
            event_log_hash,
            snapshot_hash,
            final_state_hash,
            event_count,
        }
    }

    /// Snapshots are a cache, so their hash is ignored when comparing two proofs.
    pub fn matches(&self, other: &RegistryProof) -> bool {
        self.kernel_version == other.kernel_version
            && self.event_log_hash == other.event_log_hash
            && self.final_state_hash == other.final_state_hash
            && self.event_count == other.event_count
    }
}
