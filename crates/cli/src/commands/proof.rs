// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use wipecert_kernel::proof::RegistryProof;
use wipecert_kernel::snapshot::blake3::{hash_bytes, hash_state_blake3, to_hex};
use wipecert_persistence::log::LogHeader;

use crate::engine::ForensicEngine;

/// Rebuilds the proof a node serving this log would report. Snapshots are not consulted.
///
/// Only committed bytes are hashed: a node opening this log cuts a torn tail first, and
/// rewrites a torn header as a fresh one.
pub fn compute(log_path: &str) -> anyhow::Result<RegistryProof> {
    let engine = ForensicEngine::open(log_path)?;
    let state = engine.state_at(None)?;

    let log_hash = if engine.scan.valid_len < LogHeader::SIZE as u64 {
        hash_bytes(&LogHeader::new().to_bytes())
    } else {
        let mut log_bytes = std::fs::read(log_path)?;
        log_bytes.truncate(engine.scan.valid_len as usize);
        hash_bytes(&log_bytes)
    };

    Ok(RegistryProof::new(
        log_hash,
        [0u8; 32],
        hash_state_blake3(&state),
        engine.height(),
    ))
}

pub fn run(log_path: &str) -> anyhow::Result<()> {
    let proof = compute(log_path)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Kernel Version", &proof.kernel_version.to_string()]);
    table.add_row(vec!["Event Count", &proof.event_count.to_string()]);
    table.add_row(vec!["Event Log Hash", &to_hex(&proof.event_log_hash)]);
    table.add_row(vec!["Final State Hash", &to_hex(&proof.final_state_hash)]);

    println!("\nRegistry Proof\n");
    println!("{table}\n");
    Ok(())
}
