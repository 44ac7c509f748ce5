// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot encoding.
//!
//! Layout: `[MAGIC: 4][schema version: u32 LE][bincode(RegistryState)]`.

use crate::config::STATE_SCHEMA_VERSION;
use crate::error::{RegistryError, Result};
use crate::snapshot::MAGIC;
use crate::state::kernel::RegistryState;

pub fn encode_state(state: &RegistryState) -> Result<Vec<u8>> {
    let body = bincode::serde::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| RegistryError::Codec(e.to_string()))?;

    let mut buf = Vec::with_capacity(8 + body.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&STATE_SCHEMA_VERSION.to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}
