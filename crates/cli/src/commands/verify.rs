// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use wipecert_kernel::types::certificate::Verification;
use wipecert_kernel::types::id::CertificateId;

use crate::engine::ForensicEngine;

/// Verification view of `certificate_id` after replaying the first `at` events
/// (the whole log by default).
pub fn verification(engine: &ForensicEngine, certificate_id: &str, at: Option<u64>) -> anyhow::Result<Verification> {
    let state = engine.state_at(at)?;
    Ok(state.verify(&CertificateId::from(certificate_id)))
}

pub fn run(log_path: &str, certificate_id: &str, at: Option<u64>) -> anyhow::Result<()> {
    let engine = ForensicEngine::open(log_path)?;
    let view = verification(&engine, certificate_id, at)?;

    println!("{}", serde_json::to_string_pretty(&view)?);

    if !view.exists {
        println!("\n❌ NOT FOUND: {}\n", certificate_id);
    } else if view.is_valid {
        println!("\n✅ VALID\n");
    } else {
        println!("\n⚠️  REVOKED\n");
    }
    Ok(())
}
