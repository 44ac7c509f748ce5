// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 Hashing
//!
//! BLAKE3 is the hash behind every externally visible proof: state proofs,
//! event log proofs and snapshot proofs.
//!
//! # Guarantee
//! Same state → same hash, regardless of hash-map iteration order.

use crate::state::kernel::RegistryState;

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Compute BLAKE3 hash of registry state
///
/// # Hash Input Structure
/// ```text
/// version (u64 LE), clock (u64 LE), total_certificates (u64 LE)
/// owner (presence u8, then length-prefixed string)
/// authorized count (u64 LE), then each principal in sorted order
/// For each certificate in index order:
///   every string field length-prefixed, created_at (u64 LE), is_valid (u8)
/// ```
///
/// Certificates are visited through the ordered index, never through the map.
pub fn hash_state_blake3(state: &RegistryState) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&state.version.to_le_bytes());
    hasher.update(&state.clock.to_le_bytes());
    hasher.update(&state.total_certificates.to_le_bytes());

    match &state.owner {
        Some(owner) => {
            hasher.update(&[1]);
            update_str(&mut hasher, owner.as_str());
        }
        None => {
            hasher.update(&[0]);
        }
    }

    hasher.update(&(state.authorized.len() as u64).to_le_bytes());
    for principal in state.authorized.iter() {
        update_str(&mut hasher, principal.as_str());
    }

    hasher.update(&(state.index.len() as u64).to_le_bytes());
    for cert in state.iter() {
        update_str(&mut hasher, cert.certificate_id.as_str());
        update_str(&mut hasher, &cert.device_path);
        update_str(&mut hasher, &cert.device_model);
        update_str(&mut hasher, &cert.device_serial);
        update_str(&mut hasher, &cert.wipe_method);
        update_str(&mut hasher, &cert.timestamp);
        update_str(&mut hasher, &cert.system_hostname);
        update_str(&mut hasher, &cert.tool_version);
        update_str(&mut hasher, &cert.log_hash);
        update_str(&mut hasher, &cert.content_reference);
        update_str(&mut hasher, cert.issuer.as_str());
        hasher.update(&cert.created_at.to_le_bytes());
        hasher.update(&[cert.is_valid as u8]);
    }

    *hasher.finalize().as_bytes()
}

/// Compute BLAKE3 hash of a byte slice
///
/// Generic helper for hashing snapshots and event logs.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Lowercase hex rendering used in logs and proofs.
pub fn to_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
