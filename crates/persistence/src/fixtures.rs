// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sample ledgers for CLI and node tests.

use crate::log::LogWriter;
use crate::snapshot::{self, SnapshotHeader};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use wipecert_kernel::snapshot::blake3::hash_state_blake3;
use wipecert_kernel::snapshot::encode::encode_state;
use wipecert_kernel::state::command::Command;
use wipecert_kernel::state::kernel::RegistryState;
use wipecert_kernel::types::certificate::IssueRequest;
use wipecert_kernel::types::id::{CertificateId, Principal};

pub const FIXTURE_OWNER: &str = "0xOWNER";
pub const FIXTURE_ISSUER: &str = "0xISSUER";

pub struct TestPaths {
    pub log: PathBuf,
    pub snapshot: PathBuf,
}

pub fn sample_request(id: &str, serial: &str) -> IssueRequest {
    IssueRequest {
        certificate_id: CertificateId::from(id),
        device_path: "/dev/sdb".into(),
        device_model: "Samsung SSD 870".into(),
        device_serial: serial.into(),
        wipe_method: "NIST-Purge".into(),
        timestamp: "2025-01-01T00:00:00Z".into(),
        system_hostname: "wipe-station-01".into(),
        tool_version: "1.4.2".into(),
        log_hash: "9f86d081884c7d659a2feaa0c55ad015".into(),
        content_reference: format!("bafy-{}", id),
    }
}

/// The command stream behind the sample ledger, with the host time of each call.
pub fn sample_commands() -> Vec<(Command, u64)> {
    let owner = Principal::from(FIXTURE_OWNER);
    let issuer = Principal::from(FIXTURE_ISSUER);
    vec![
        (Command::Initialize { owner: owner.clone() }, 1_700_000_000),
        (Command::Issue { caller: owner.clone(), request: sample_request("C1", "SN-001") }, 1_700_000_010),
        (Command::AuthorizeIssuer { caller: owner.clone(), principal: issuer.clone() }, 1_700_000_020),
        (Command::Issue { caller: issuer.clone(), request: sample_request("C2", "SN-002") }, 1_700_000_030),
        (Command::Revoke { caller: owner.clone(), certificate_id: CertificateId::from("C1") }, 1_700_000_040),
        (Command::Issue { caller: issuer, request: sample_request("C3", "SN-003") }, 1_700_000_050),
    ]
}

/// Writes `events.log` with the full sample stream and `snapshot.bin` taken after
/// `snapshot_height` events.
pub fn generate_test_scenario(dir: &Path, snapshot_height: usize) -> Result<TestPaths> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let log_path = dir.join("events.log");
    let snapshot_path = dir.join("snapshot.bin");

    let (mut writer, _) = LogWriter::open(&log_path)?;
    let mut state = RegistryState::new();

    for (i, (cmd, now)) in sample_commands().into_iter().enumerate() {
        if i == snapshot_height {
            write_snapshot(&snapshot_path, &state, now)?;
        }
        let event = state
            .prepare(&cmd, now)
            .map_err(|e| anyhow!("fixture command {} rejected: {}", cmd.name(), e))?
            .ok_or_else(|| anyhow!("fixture command {} was a no-op", cmd.name()))?;
        writer.append(&event)?;
        state.apply_event(&event)?;
    }
    if snapshot_height >= sample_commands().len() {
        write_snapshot(&snapshot_path, &state, 1_700_000_100)?;
    }

    Ok(TestPaths {
        log: log_path,
        snapshot: snapshot_path,
    })
}

fn write_snapshot(path: &Path, state: &RegistryState, timestamp: u64) -> Result<()> {
    let body = encode_state(state)?;
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&hash_state_blake3(state)[..16]);

    let header = SnapshotHeader::new(state.version(), timestamp, prefix);
    fs::write(path, snapshot::encode_snapshot(&header, &body))
        .with_context(|| format!("writing {}", path.display()))
}
