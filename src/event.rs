// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Log as Primary Truth
//!
//! Every state transition of the registry is expressed as a `RegistryEvent`.
//! Events are produced by `RegistryState::prepare`, persisted, and only then applied.
//!
//! # Invariants
//! - Same event log => same final state
//! - Events are immutable once committed
//! - Events carry the acting principal and the logical time, so replay re-checks
//!   authorization and clock monotonicity instead of trusting the log blindly

use serde::{Deserialize, Serialize};
use crate::types::certificate::Certificate;
use crate::types::id::{CertificateId, Principal};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Seeds the owner. Must be the first event of every log.
    Initialized {
        owner: Principal,
    },

    /// A new certificate. `certificate.issuer` is the acting principal.
    CertificateIssued {
        certificate: Certificate,
    },

    CertificateRevoked {
        certificate_id: CertificateId,
        revoker: Principal,
        at: u64,
    },

    IssuerAuthorized {
        principal: Principal,
        by: Principal,
        at: u64,
    },

    IssuerDeauthorized {
        principal: Principal,
        by: Principal,
        at: u64,
    },
}

impl RegistryEvent {
    /// Returns a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            RegistryEvent::Initialized { .. } => "Initialized",
            RegistryEvent::CertificateIssued { .. } => "CertificateIssued",
            RegistryEvent::CertificateRevoked { .. } => "CertificateRevoked",
            RegistryEvent::IssuerAuthorized { .. } => "IssuerAuthorized",
            RegistryEvent::IssuerDeauthorized { .. } => "IssuerDeauthorized",
        }
    }

    /// Logical time carried by the event. `Initialized` predates the clock.
    pub fn logical_time(&self) -> u64 {
        match self {
            RegistryEvent::Initialized { .. } => 0,
            RegistryEvent::CertificateIssued { certificate } => certificate.created_at,
            RegistryEvent::CertificateRevoked { at, .. }
            | RegistryEvent::IssuerAuthorized { at, .. }
            | RegistryEvent::IssuerDeauthorized { at, .. } => *at,
        }
    }

    pub fn certificate_id(&self) -> Option<&CertificateId> {
        match self {
            RegistryEvent::CertificateIssued { certificate } => Some(&certificate.certificate_id),
            RegistryEvent::CertificateRevoked { certificate_id, .. } => Some(certificate_id),
            _ => None,
        }
    }

    /// True if `principal` acted in, or was the subject of, this event.
    pub fn involves(&self, principal: &Principal) -> bool {
        match self {
            RegistryEvent::Initialized { owner } => owner == principal,
            RegistryEvent::CertificateIssued { certificate } => &certificate.issuer == principal,
            RegistryEvent::CertificateRevoked { revoker, .. } => revoker == principal,
            RegistryEvent::IssuerAuthorized { principal: p, by, .. }
            | RegistryEvent::IssuerDeauthorized { principal: p, by, .. } => p == principal || by == principal,
        }
    }
}

/// Notification published to audit watchers after an event commits.
///
/// This is the external view: issuance carries only the fields verifiers index on,
/// not the full record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistryInitialized {
        sequence: u64,
        owner: Principal,
    },
    CertificateIssued {
        sequence: u64,
        certificate_id: CertificateId,
        device_serial: String,
        content_reference: String,
        issuer: Principal,
        timestamp: u64,
    },
    CertificateRevoked {
        sequence: u64,
        certificate_id: CertificateId,
        revoker: Principal,
        timestamp: u64,
    },
    IssuerAuthorized {
        sequence: u64,
        principal: Principal,
        by: Principal,
        timestamp: u64,
    },
    IssuerDeauthorized {
        sequence: u64,
        principal: Principal,
        by: Principal,
        timestamp: u64,
    },
}

impl AuditEvent {
    /// Builds the notification for the event committed at log position `sequence`.
    pub fn from_committed(sequence: u64, event: &RegistryEvent) -> Self {
        match event {
            RegistryEvent::Initialized { owner } => AuditEvent::RegistryInitialized {
                sequence,
                owner: owner.clone(),
            },
            RegistryEvent::CertificateIssued { certificate } => AuditEvent::CertificateIssued {
                sequence,
                certificate_id: certificate.certificate_id.clone(),
                device_serial: certificate.device_serial.clone(),
                content_reference: certificate.content_reference.clone(),
                issuer: certificate.issuer.clone(),
                timestamp: certificate.created_at,
            },
            RegistryEvent::CertificateRevoked { certificate_id, revoker, at } => AuditEvent::CertificateRevoked {
                sequence,
                certificate_id: certificate_id.clone(),
                revoker: revoker.clone(),
                timestamp: *at,
            },
            RegistryEvent::IssuerAuthorized { principal, by, at } => AuditEvent::IssuerAuthorized {
                sequence,
                principal: principal.clone(),
                by: by.clone(),
                timestamp: *at,
            },
            RegistryEvent::IssuerDeauthorized { principal, by, at } => AuditEvent::IssuerDeauthorized {
                sequence,
                principal: principal.clone(),
                by: by.clone(),
                timestamp: *at,
            },
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            AuditEvent::RegistryInitialized { sequence, .. }
            | AuditEvent::CertificateIssued { sequence, .. }
            | AuditEvent::CertificateRevoked { sequence, .. }
            | AuditEvent::IssuerAuthorized { sequence, .. }
            | AuditEvent::IssuerDeauthorized { sequence, .. } => *sequence,
        }
    }
}
