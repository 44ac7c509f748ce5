// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wipecert_cli::commands::{inspect, proof, timeline, verify};

#[derive(Parser)]
#[command(name = "wipecert")]
#[command(about = "WipeCert Forensic CLI - offline inspection of a certificate registry ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the ledger files and show status.
    /// If --dir is provided, it resolves events.log and snapshot.bin inside it.
    Inspect {
        /// Optional data directory of a node.
        #[arg(long, short)]
        dir: Option<PathBuf>,

        /// Path to the snapshot file (overrides auto-detection)
        #[arg(long)]
        snapshot_path: Option<String>,

        /// Path to the event log (overrides auto-detection)
        #[arg(long)]
        log_path: Option<String>,
    },
    /// List the event timeline
    Timeline {
        log_path: String,

        /// Only events touching this certificate
        #[arg(long)]
        certificate: Option<String>,

        /// Only events a principal acted in or was the subject of
        #[arg(long)]
        principal: Option<String>,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Replay the log and print the verification view of a certificate
    Verify {
        log_path: String,
        certificate_id: String,

        /// Replay only the first N events
        #[arg(long)]
        at: Option<u64>,
    },
    /// Replay the log and print its proof
    Proof {
        log_path: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            dir,
            snapshot_path,
            log_path,
        } => inspect::run(dir, snapshot_path, log_path),
        Commands::Timeline {
            log_path,
            certificate,
            principal,
            json,
        } => timeline::run(&log_path, certificate, principal, json),
        Commands::Verify {
            log_path,
            certificate_id,
            at,
        } => verify::run(&log_path, &certificate_id, at),
        Commands::Proof { log_path } => proof::run(&log_path),
    }
}
