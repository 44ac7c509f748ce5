// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Journal - committed history kept in memory.
//!
//! `committed()[i]` is the event at log sequence `i`. Only events that are durable on
//! disk and applied to the live state are pushed here, so the journal answers audit
//! queries without touching the log file.

use wipecert_kernel::event::{AuditEvent, RegistryEvent};
use wipecert_kernel::types::id::{CertificateId, Principal};

#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    committed: Vec<RegistryEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal from committed events (recovery scenario)
    pub fn from_committed(events: Vec<RegistryEvent>) -> Self {
        Self { committed: events }
    }

    /// Records an event that is already durable and applied. Returns its sequence.
    pub fn push_committed(&mut self, event: RegistryEvent) -> u64 {
        self.committed.push(event);
        self.committed.len() as u64 - 1
    }

    pub fn committed(&self) -> &[RegistryEvent] {
        &self.committed
    }

    pub fn committed_height(&self) -> u64 {
        self.committed.len() as u64
    }

    /// Audit notifications for every committed event from `from` onward.
    pub fn audit_since(&self, from: u64) -> Vec<AuditEvent> {
        self.committed
            .iter()
            .enumerate()
            .skip(from as usize)
            .map(|(seq, event)| AuditEvent::from_committed(seq as u64, event))
            .collect()
    }

    /// History of one certificate: its issuance and revocation, in commit order.
    pub fn for_certificate(&self, id: &CertificateId) -> Vec<AuditEvent> {
        self.filtered(|event| event.certificate_id() == Some(id))
    }

    /// Events a principal acted in or was the subject of.
    pub fn for_principal(&self, principal: &Principal) -> Vec<AuditEvent> {
        self.filtered(|event| event.involves(principal))
    }

    fn filtered(&self, keep: impl Fn(&RegistryEvent) -> bool) -> Vec<AuditEvent> {
        self.committed
            .iter()
            .enumerate()
            .filter(|(_, event)| keep(event))
            .map(|(seq, event)| AuditEvent::from_committed(seq as u64, event))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wipecert_kernel::types::certificate::{Certificate, IssueRequest};

    fn issued(id: &str, issuer: &str, at: u64) -> RegistryEvent {
        let req = IssueRequest {
            certificate_id: CertificateId::from(id),
            device_serial: format!("SN-{}", id),
            ..Default::default()
        };
        RegistryEvent::CertificateIssued {
            certificate: Certificate::issue(req, Principal::from(issuer), at),
        }
    }

    fn journal() -> EventJournal {
        EventJournal::from_committed(vec![
            RegistryEvent::Initialized { owner: Principal::from("O") },
            issued("C1", "O", 1),
            RegistryEvent::IssuerAuthorized { principal: Principal::from("P"), by: Principal::from("O"), at: 2 },
            issued("C2", "P", 3),
            RegistryEvent::CertificateRevoked {
                certificate_id: CertificateId::from("C1"),
                revoker: Principal::from("P"),
                at: 4,
            },
        ])
    }

    #[test]
    fn test_journal_push_assigns_sequence() {
        let mut journal = EventJournal::new();
        assert_eq!(journal.push_committed(RegistryEvent::Initialized { owner: Principal::from("O") }), 0);
        assert_eq!(journal.push_committed(issued("C1", "O", 1)), 1);
        assert_eq!(journal.committed_height(), 2);
    }

    #[test]
    fn test_certificate_history() {
        let history = journal().for_certificate(&CertificateId::from("C1"));
        let sequences: Vec<u64> = history.iter().map(AuditEvent::sequence).collect();
        assert_eq!(sequences, vec![1, 4]);
        assert!(matches!(history[1], AuditEvent::CertificateRevoked { .. }));
    }

    #[test]
    fn test_principal_history() {
        let sequences: Vec<u64> = journal()
            .for_principal(&Principal::from("P"))
            .iter()
            .map(AuditEvent::sequence)
            .collect();
        assert_eq!(sequences, vec![2, 3, 4]);
    }

    #[test]
    fn test_audit_since() {
        let tail = journal().audit_since(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence(), 3);
        assert!(journal().audit_since(99).is_empty());
    }
}
