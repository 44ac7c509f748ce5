// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use std::path::{Path, PathBuf};
use wipecert_kernel::snapshot::blake3::{hash_state_blake3, to_hex};
use wipecert_kernel::snapshot::decode::decode_state;
use wipecert_persistence::snapshot;

use super::render_time;
use crate::engine::ForensicEngine;

/// One row of the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub file: &'static str,
    pub status: &'static str,
    pub details: String,
}

pub fn run(
    dir: Option<PathBuf>,
    snapshot_path_arg: Option<String>,
    log_path_arg: Option<String>,
) -> anyhow::Result<()> {
    let (s_path, l_path) = match dir {
        Some(d) => (d.join("snapshot.bin"), d.join("events.log")),
        None => (
            PathBuf::from(snapshot_path_arg.unwrap_or_else(|| "snapshot.bin".to_string())),
            PathBuf::from(log_path_arg.unwrap_or_else(|| "events.log".to_string())),
        ),
    };

    println!("\nWipeCert Status Report");
    println!("----------------------");

    // Build Table
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["File", "Status", "Details"]);

    for row in report(&s_path, &l_path) {
        table.add_row(vec![row.file, row.status, &row.details]);
    }

    println!("{table}\n");

    Ok(())
}

/// Status of the event log and the snapshot, the snapshot checked against the log.
pub fn report(snapshot_path: &Path, log_path: &Path) -> Vec<FileStatus> {
    let mut rows = Vec::new();

    // 1. Event log
    let log_height = if log_path.exists() {
        match ForensicEngine::open(log_path) {
            Ok(engine) => {
                let mut details = format!("{} events", engine.height());
                if engine.scan.torn_bytes > 0 {
                    details.push_str(&format!(", {} torn bytes at tail", engine.scan.torn_bytes));
                }
                rows.push(FileStatus { file: "Event Log", status: "FOUND", details });
                Some(engine.height())
            }
            Err(e) => {
                rows.push(FileStatus { file: "Event Log", status: "CORRUPT", details: format!("{:#}", e) });
                None
            }
        }
    } else {
        rows.push(FileStatus { file: "Event Log", status: "MISSING", details: String::new() });
        None
    };

    // 2. Snapshot
    if !snapshot_path.exists() {
        rows.push(FileStatus { file: "Snapshot", status: "MISSING", details: String::new() });
        return rows;
    }

    let (header, body) = match snapshot::read_snapshot(snapshot_path) {
        Ok(res) => res,
        Err(e) => {
            rows.push(FileStatus { file: "Snapshot", status: "CORRUPT", details: e.to_string() });
            return rows;
        }
    };

    let hash_ok = decode_state(&body)
        .map(|state| hash_state_blake3(&state)[..16] == header.state_hash)
        .unwrap_or(false);

    let mut details = format!(
        "Magic: {}, Ver: {}, Height: {}, Saved: {}, State: {}",
        std::str::from_utf8(&header.magic).unwrap_or("BAD"),
        header.version,
        header.event_height,
        render_time(header.timestamp),
        to_hex(&header.state_hash),
    );

    let status = match (hash_ok, log_height) {
        (false, _) => "CORRUPT",
        (true, Some(height)) if header.event_height > height => {
            details.push_str(&format!(" (ahead of log height {})", height));
            "STALE"
        }
        _ => "FOUND",
    };
    rows.push(FileStatus { file: "Snapshot", status, details });

    rows
}
