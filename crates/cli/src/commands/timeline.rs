// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use wipecert_kernel::event::RegistryEvent;
use wipecert_kernel::types::id::{CertificateId, Principal};

use super::render_time;
use crate::engine::ForensicEngine;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimelineRow {
    pub sequence: u64,
    pub time: u64,
    pub event: &'static str,
    pub subject: String,
    pub actor: String,
}

impl TimelineRow {
    fn from_event(sequence: u64, event: &RegistryEvent) -> Self {
        let (subject, actor) = match event {
            RegistryEvent::Initialized { owner } => (owner.to_string(), String::new()),
            RegistryEvent::CertificateIssued { certificate } => {
                (certificate.certificate_id.to_string(), certificate.issuer.to_string())
            }
            RegistryEvent::CertificateRevoked { certificate_id, revoker, .. } => {
                (certificate_id.to_string(), revoker.to_string())
            }
            RegistryEvent::IssuerAuthorized { principal, by, .. }
            | RegistryEvent::IssuerDeauthorized { principal, by, .. } => (principal.to_string(), by.to_string()),
        };
        Self {
            sequence,
            time: event.logical_time(),
            event: event.event_type(),
            subject,
            actor,
        }
    }
}

/// Events of the log, optionally narrowed to one certificate and/or one principal.
pub fn collect(
    engine: &ForensicEngine,
    certificate: Option<&CertificateId>,
    principal: Option<&Principal>,
) -> Vec<TimelineRow> {
    engine
        .events()
        .iter()
        .enumerate()
        .filter(|(_, e)| certificate.map_or(true, |id| e.certificate_id() == Some(id)))
        .filter(|(_, e)| principal.map_or(true, |p| e.involves(p)))
        .map(|(seq, e)| TimelineRow::from_event(seq as u64, e))
        .collect()
}

pub fn run(log_path: &str, certificate: Option<String>, principal: Option<String>, json: bool) -> anyhow::Result<()> {
    let engine = ForensicEngine::open(log_path)?;
    let certificate = certificate.map(CertificateId::new);
    let principal = principal.map(Principal::new);
    let rows = collect(&engine, certificate.as_ref(), principal.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Seq", "Time", "Event", "Subject", "Actor"]);

    for row in rows {
        // Initialization predates the logical clock.
        let ts = if row.time == 0 { "-".to_string() } else { render_time(row.time) };
        table.add_row(vec![
            row.sequence.to_string(),
            ts,
            row.event.to_string(),
            row.subject,
            row.actor,
        ]);
    }

    println!("\nEvent Timeline\n");
    println!("{table}\n");

    if engine.scan.torn_bytes > 0 {
        println!("⚠️  WARNING: {} bytes of an incomplete frame follow the last event.\n", engine.scan.torn_bytes);
    }

    Ok(())
}
