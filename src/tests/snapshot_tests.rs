// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::RegistryError;
use crate::snapshot::blake3::hash_state_blake3;
use crate::snapshot::decode::decode_state;
use crate::snapshot::encode::encode_state;
use crate::state::command::Command;
use crate::state::kernel::RegistryState;
use crate::tests::fixtures::{execute, initialized, issue, owner, request};
use crate::types::id::{CertificateId, Principal};

fn populated() -> RegistryState {
    let mut state = initialized();
    let p = Principal::from("P");
    execute(&mut state, Command::AuthorizeIssuer { caller: owner(), principal: p.clone() }, 1).unwrap();
    issue(&mut state, &owner(), request("C1", "SN-001", "NIST-Purge", "bafy123"), 2).unwrap();
    issue(&mut state, &p, request("C2", "SN-002", "NIST-Clear", "bafy456"), 3).unwrap();
    execute(&mut state, Command::Revoke { caller: p, certificate_id: CertificateId::from("C1") }, 4).unwrap();
    state
}

#[test]
fn test_snapshot_restore() {
    let state = populated();
    let hash_orig = hash_state_blake3(&state);

    let buf = encode_state(&state).unwrap();
    let restored = decode_state(&buf).unwrap();

    assert_eq!(hash_state_blake3(&restored), hash_orig);
    assert_eq!(restored.version(), state.version());
    assert_eq!(restored.clock(), 4);
    assert_eq!(restored.list_all(), state.list_all());
    assert!(!restored.verify(&CertificateId::from("C1")).is_valid);
    assert!(restored.verify(&CertificateId::from("C2")).is_valid);
}

#[test]
fn test_restored_state_keeps_enforcing_rules() {
    let state = populated();
    let mut restored = decode_state(&encode_state(&state).unwrap()).unwrap();

    let err = issue(&mut restored, &owner(), request("C2", "SN", "m", "r"), 5).unwrap_err();
    assert_eq!(err, RegistryError::AlreadyExists(CertificateId::from("C2")));

    issue(&mut restored, &owner(), request("C3", "SN", "m", "r"), 1).unwrap();
    // Clock survives the round trip, so the stale host time is clamped.
    assert_eq!(restored.get_details(&CertificateId::from("C3")).unwrap().created_at, 4);
}

#[test]
fn test_corrupt_magic_rejected() {
    let mut buf = encode_state(&populated()).unwrap();
    buf[0] ^= 0xFF;
    assert!(matches!(decode_state(&buf), Err(RegistryError::Codec(_))));
}

#[test]
fn test_truncated_image_rejected() {
    let buf = encode_state(&populated()).unwrap();
    assert!(decode_state(&buf[..buf.len() - 3]).is_err());
    assert!(decode_state(&buf[..4]).is_err());
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut buf = encode_state(&populated()).unwrap();
    buf.push(0);
    assert!(matches!(decode_state(&buf), Err(RegistryError::Codec(_))));
}

#[test]
fn test_invariant_violation_rejected() {
    let mut state = populated();
    state.total_certificates += 1;
    let buf = encode_state(&state).unwrap();

    match decode_state(&buf) {
        Err(RegistryError::Codec(msg)) => assert!(msg.contains("invariant"), "{}", msg),
        other => panic!("expected invariant failure, got {:?}", other),
    }
}

#[test]
fn test_owner_outside_authorized_set_rejected() {
    let mut state = populated();
    state.authorized.remove(&owner());
    assert!(decode_state(&encode_state(&state).unwrap()).is_err());
}
