// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Commit - The Safety Wall
//!
//! This module enforces the commit barrier semantics:
//! 1. Command validated against the live state (no mutation)
//! 2. Event persisted to disk (fsync)
//! 3. Event applied to the live state
//! 4. Event recorded in the journal
//! 5. Audit notification published
//!
//! A rejected command stops at step 1 and leaves log, state and journal untouched.
//!
//! # Invariants
//! - committed = durable
//! - No partial commits
//! - No ghost writes
//! - One audit notification per committed event, none for rejected commands

use std::time::Instant;

use thiserror::Error;
use tokio::sync::broadcast;
use wipecert_kernel::error::RegistryError;
use wipecert_kernel::event::{AuditEvent, RegistryEvent};
use wipecert_kernel::state::command::Command;
use wipecert_kernel::state::kernel::RegistryState;
use wipecert_persistence::PersistenceError;

use crate::events::event_journal::EventJournal;
use crate::events::event_log::EventLog;

#[derive(Error, Debug)]
pub enum CommitError {
    /// The registry refused the command. Nothing was written.
    #[error(transparent)]
    Rejected(RegistryError),

    #[error("Event log error: {0}")]
    EventLog(#[from] PersistenceError),

    /// The event is durable but the live state refused it. The node must stop serving.
    #[error("Kernel error during live apply: {0}")]
    LiveApply(RegistryError),
}

pub type Result<T> = std::result::Result<T, CommitError>;

/// Result of a commit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// Event committed at `sequence`.
    Committed { sequence: u64, event: RegistryEvent },

    /// Command was valid but changed nothing. No event was written.
    Unchanged,
}

/// Event committer - the only path that mutates registry state.
pub struct EventCommitter {
    event_log: EventLog,
    journal: EventJournal,
    live_state: RegistryState,
    notifier: broadcast::Sender<AuditEvent>,
}

impl EventCommitter {
    pub fn new(event_log: EventLog, journal: EventJournal, live_state: RegistryState, event_buffer: usize) -> Self {
        let (notifier, _) = broadcast::channel(event_buffer.max(1));
        Self {
            event_log,
            journal,
            live_state,
            notifier,
        }
    }

    /// Commit a command.
    ///
    /// `now` is the host time in seconds; the kernel clamps it so logical time never
    /// runs backwards.
    pub fn commit(&mut self, cmd: &Command, now: u64) -> Result<CommitResult> {
        let start = Instant::now();

        let event = match self.live_state.prepare(cmd, now) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!("Command {} changed nothing", cmd.name());
                return Ok(CommitResult::Unchanged);
            }
            Err(e) => {
                tracing::debug!("Command {} rejected: {}", cmd.name(), e);
                metrics::increment_counter!("wipecert_mutations_rejected_total", "kind" => e.kind());
                return Err(CommitError::Rejected(e));
            }
        };

        // Persist FIRST. Nothing in memory changes unless this succeeds.
        let sequence = self.event_log.append(&event)?;

        if let Err(e) = self.live_state.apply_event(&event) {
            tracing::error!(
                "CRITICAL: event {} is durable but live apply failed: {}",
                sequence,
                e
            );
            return Err(CommitError::LiveApply(e));
        }
        self.journal.push_committed(event.clone());

        // No receivers is fine: audit watchers are optional.
        let _ = self.notifier.send(AuditEvent::from_committed(sequence, &event));

        match &event {
            RegistryEvent::CertificateIssued { .. } => {
                metrics::increment_counter!("wipecert_certificates_issued_total")
            }
            RegistryEvent::CertificateRevoked { .. } => {
                metrics::increment_counter!("wipecert_certificates_revoked_total")
            }
            _ => {}
        }
        metrics::histogram!("wipecert_event_commit_duration_seconds", start.elapsed().as_secs_f64());
        tracing::debug!("Event committed: {} at sequence {}", event.event_type(), sequence);

        Ok(CommitResult::Committed { sequence, event })
    }

    /// New receiver for audit notifications committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.notifier.subscribe()
    }

    pub fn live_state(&self) -> &RegistryState {
        &self.live_state
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wipecert_kernel::types::certificate::IssueRequest;
    use wipecert_kernel::types::id::{CertificateId, Principal};

    fn owner() -> Principal {
        Principal::from("0xOWNER")
    }

    fn issue(id: &str, caller: Principal) -> Command {
        Command::Issue {
            caller,
            request: IssueRequest {
                certificate_id: CertificateId::from(id),
                device_serial: "SN-001".into(),
                ..Default::default()
            },
        }
    }

    fn committer(log: EventLog) -> EventCommitter {
        let mut c = EventCommitter::new(log, EventJournal::new(), RegistryState::new(), 16);
        c.commit(&Command::Initialize { owner: owner() }, 0).unwrap();
        c
    }

    #[test]
    fn test_commit_success() {
        let dir = tempdir().unwrap();
        let (log, _) = EventLog::open(dir.path().join("events.log")).unwrap();
        let mut committer = committer(log);
        let mut rx = committer.subscribe();

        let result = committer.commit(&issue("C1", owner()), 10).unwrap();
        assert!(matches!(result, CommitResult::Committed { sequence: 1, .. }));

        assert!(committer.live_state().verify(&CertificateId::from("C1")).exists);
        assert_eq!(committer.journal().committed_height(), 2);
        assert_eq!(committer.event_log().height(), 2);

        let note = rx.try_recv().unwrap();
        assert_eq!(note.sequence(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rejected_command_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let (log, _) = EventLog::open(&path).unwrap();
        let mut committer = committer(log);
        let mut rx = committer.subscribe();
        let len_before = std::fs::metadata(&path).unwrap().len();

        let err = committer.commit(&issue("C1", Principal::from("stranger")), 10).unwrap_err();
        assert!(matches!(err, CommitError::Rejected(RegistryError::Unauthorized { .. })));

        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
        assert_eq!(committer.journal().committed_height(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_noop_command_is_unchanged() {
        let mut committer = committer(EventLog::in_memory());
        let result = committer
            .commit(&Command::AuthorizeIssuer { caller: owner(), principal: owner() }, 5)
            .unwrap();
        assert_eq!(result, CommitResult::Unchanged);
        assert_eq!(committer.event_log().height(), 1);
    }
}
