// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic Replay Logic.

use crate::error::RegistryError;
use crate::event::RegistryEvent;
use crate::snapshot::blake3::hash_state_blake3;
use crate::state::kernel::RegistryState;

/// Failure to replay: the index of the offending event and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFailure {
    pub index: usize,
    pub error: RegistryError,
}

/// Applies `events` in order on top of `base`.
///
/// Each event is re-validated, so a log containing a transition the registry would
/// have refused (an unauthorized issuance, a second revocation) stops replay.
pub fn replay_onto(mut base: RegistryState, events: &[RegistryEvent]) -> Result<RegistryState, ReplayFailure> {
    for (index, event) in events.iter().enumerate() {
        base.apply_event(event)
            .map_err(|error| ReplayFailure { index, error })?;
    }
    Ok(base)
}

/// Replays a full log into a fresh state.
pub fn replay_events(events: &[RegistryEvent]) -> Result<RegistryState, ReplayFailure> {
    replay_onto(RegistryState::new(), events)
}

/// Replays a full log and returns the canonical state hash.
pub fn replay_and_hash(events: &[RegistryEvent]) -> Result<[u8; 32], ReplayFailure> {
    replay_events(events).map(|state| hash_state_blake3(&state))
}
