// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot decoding.

use crate::config::STATE_SCHEMA_VERSION;
use crate::error::{RegistryError, Result};
use crate::snapshot::MAGIC;
use crate::state::kernel::RegistryState;

pub fn decode_state(buf: &[u8]) -> Result<RegistryState> {
    if buf.len() < 8 {
        return Err(RegistryError::Codec("state image too short".to_string()));
    }
    if &buf[0..4] != MAGIC {
        return Err(RegistryError::Codec("invalid state magic".to_string()));
    }

    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&buf[4..8]);
    let version = u32::from_le_bytes(version_bytes);
    if version != STATE_SCHEMA_VERSION {
        return Err(RegistryError::Codec(format!(
            "unsupported state schema version {} (expected {})",
            version, STATE_SCHEMA_VERSION
        )));
    }

    let (state, read): (RegistryState, usize) =
        bincode::serde::decode_from_slice(&buf[8..], bincode::config::standard())
            .map_err(|e| RegistryError::Codec(e.to_string()))?;

    if 8 + read != buf.len() {
        return Err(RegistryError::Codec("trailing bytes after state image".to_string()));
    }

    state.validate_invariants()?;
    Ok(state)
}
