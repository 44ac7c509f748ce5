// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::Result;
use crate::event::RegistryEvent;
use crate::state::command::Command;
use crate::state::kernel::RegistryState;
use crate::types::certificate::IssueRequest;
use crate::types::id::{CertificateId, Principal};

pub fn owner() -> Principal {
    Principal::from("0xOWNER")
}

pub fn request(id: &str, serial: &str, method: &str, content: &str) -> IssueRequest {
    IssueRequest {
        certificate_id: CertificateId::from(id),
        device_path: "/dev/sdb".into(),
        device_model: "Samsung SSD 870".into(),
        device_serial: serial.into(),
        wipe_method: method.into(),
        timestamp: "2025-01-01T00:00:00Z".into(),
        system_hostname: "wipe-station-01".into(),
        tool_version: "1.4.2".into(),
        log_hash: "9f86d081884c7d659a2feaa0c55ad015".into(),
        content_reference: content.into(),
    }
}

/// Prepares and applies in one step, the way the node commits without a log.
pub fn execute(state: &mut RegistryState, cmd: Command, now: u64) -> Result<Option<RegistryEvent>> {
    let event = state.prepare(&cmd, now)?;
    if let Some(ref event) = event {
        state.apply_event(event)?;
    }
    Ok(event)
}

pub fn initialized() -> RegistryState {
    let mut state = RegistryState::new();
    execute(&mut state, Command::Initialize { owner: owner() }, 0).unwrap();
    state
}

pub fn issue(state: &mut RegistryState, caller: &Principal, req: IssueRequest, now: u64) -> Result<Option<RegistryEvent>> {
    execute(state, Command::Issue { caller: caller.clone(), request: req }, now)
}
