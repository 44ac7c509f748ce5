// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry State definition.
//!
//! All registry state lives in one value: the certificate store, the insertion-ordered
//! index, the authorized set, the running total and the logical clock. Index append,
//! counter increment and record write happen in the same `apply_event` call and can
//! never be observed apart.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::event::RegistryEvent;
use crate::state::command::Command;
use crate::types::certificate::{Certificate, Verification};
use crate::types::id::{CertificateId, Principal};
use crate::types::role::{Capability, Role};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub(crate) owner: Option<Principal>,
    pub(crate) authorized: BTreeSet<Principal>,
    pub(crate) certificates: FxHashMap<CertificateId, Certificate>,
    pub(crate) index: Vec<CertificateId>,
    pub(crate) total_certificates: u64,
    /// Last logical time handed out. Never decreases.
    pub(crate) clock: u64,
    /// Number of events applied.
    pub(crate) version: u64,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Read APIs ---

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn is_initialized(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<&Principal> {
        self.owner.as_ref()
    }

    pub fn role_of(&self, principal: &Principal) -> Option<Role> {
        if self.owner.as_ref() == Some(principal) {
            Some(Role::Owner)
        } else if self.authorized.contains(principal) {
            Some(Role::Issuer)
        } else {
            None
        }
    }

    pub fn is_authorized(&self, principal: &Principal) -> bool {
        self.role_of(principal).is_some()
    }

    /// Authorized principals in sorted order. Includes the owner.
    pub fn authorized_issuers(&self) -> Vec<Principal> {
        self.authorized.iter().cloned().collect()
    }

    pub fn total_certificates(&self) -> u64 {
        self.total_certificates
    }

    pub fn get_certificate(&self, id: &CertificateId) -> Option<&Certificate> {
        self.certificates.get(id)
    }

    pub fn verify(&self, id: &CertificateId) -> Verification {
        self.certificates
            .get(id)
            .map(Verification::from)
            .unwrap_or_else(Verification::missing)
    }

    pub fn get_details(&self, id: &CertificateId) -> Result<Certificate> {
        self.certificates
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub fn list_all(&self) -> &[CertificateId] {
        &self.index
    }

    pub fn list_by_issuer(&self, issuer: &Principal) -> Vec<CertificateId> {
        self.index
            .iter()
            .filter(|id| {
                self.certificates
                    .get(*id)
                    .map_or(false, |cert| &cert.issuer == issuer)
            })
            .cloned()
            .collect()
    }

    /// Certificates in issuance order.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> + '_ {
        self.index.iter().filter_map(move |id| self.certificates.get(id))
    }

    /// Checks the structural invariants of a state that did not come from `apply_event`
    /// (a decoded snapshot).
    pub fn validate_invariants(&self) -> Result<()> {
        let broken = |what: &'static str| Err(RegistryError::Codec(format!("state invariant violated: {}", what)));

        if self.total_certificates != self.index.len() as u64 {
            return broken("total does not match index length");
        }
        if self.certificates.len() != self.index.len() {
            return broken("index and certificate store differ in size");
        }
        let mut seen = BTreeSet::new();
        for id in &self.index {
            if !seen.insert(id) {
                return broken("duplicate id in index");
            }
            match self.certificates.get(id) {
                Some(cert) if &cert.certificate_id == id && cert.created_at <= self.clock => {}
                _ => return broken("index entry without matching certificate"),
            }
        }
        match &self.owner {
            Some(owner) if !self.authorized.contains(owner) => broken("owner missing from authorized set"),
            None if !self.authorized.is_empty() || !self.index.is_empty() => broken("uninitialized state holds data"),
            _ => Ok(()),
        }
    }

    // --- Write Logic ---

    /// Validates a command against the current state and turns it into the event to commit.
    ///
    /// `now` is a hint from the host clock; the event's logical time is clamped so it never
    /// precedes the last applied one. Returns `Ok(None)` for commands that are valid but
    /// change nothing (authorizing a principal twice, deauthorizing a stranger).
    /// The state is never modified here.
    pub fn prepare(&self, cmd: &Command, now: u64) -> Result<Option<RegistryEvent>> {
        let at = now.max(self.clock);

        let event = match cmd {
            Command::Initialize { owner } => RegistryEvent::Initialized { owner: owner.clone() },
            Command::Issue { caller, request } => RegistryEvent::CertificateIssued {
                certificate: Certificate::issue(request.clone(), caller.clone(), at),
            },
            Command::Revoke { caller, certificate_id } => RegistryEvent::CertificateRevoked {
                certificate_id: certificate_id.clone(),
                revoker: caller.clone(),
                at,
            },
            Command::AuthorizeIssuer { caller, principal } => {
                self.require(caller, Capability::ManageIssuers)?;
                if !principal.is_empty() && self.authorized.contains(principal) {
                    return Ok(None);
                }
                RegistryEvent::IssuerAuthorized { principal: principal.clone(), by: caller.clone(), at }
            }
            Command::DeauthorizeIssuer { caller, principal } => {
                self.require(caller, Capability::ManageIssuers)?;
                if self.owner.as_ref() != Some(principal) && !self.authorized.contains(principal) {
                    return Ok(None);
                }
                RegistryEvent::IssuerDeauthorized { principal: principal.clone(), by: caller.clone(), at }
            }
        };

        self.check(&event)?;
        Ok(Some(event))
    }

    /// Applies a committed event. Re-runs every precondition, so a corrupt or foreign
    /// log fails closed on replay instead of producing an impossible state.
    pub fn apply_event(&mut self, event: &RegistryEvent) -> Result<()> {
        self.check(event)?;

        match event {
            RegistryEvent::Initialized { owner } => {
                self.owner = Some(owner.clone());
                self.authorized.insert(owner.clone());
            }
            RegistryEvent::CertificateIssued { certificate } => {
                self.index.push(certificate.certificate_id.clone());
                self.certificates
                    .insert(certificate.certificate_id.clone(), certificate.clone());
                self.total_certificates += 1;
            }
            RegistryEvent::CertificateRevoked { certificate_id, .. } => {
                if let Some(cert) = self.certificates.get_mut(certificate_id) {
                    cert.is_valid = false;
                }
            }
            RegistryEvent::IssuerAuthorized { principal, .. } => {
                self.authorized.insert(principal.clone());
            }
            RegistryEvent::IssuerDeauthorized { principal, .. } => {
                self.authorized.remove(principal);
            }
        }

        self.clock = self.clock.max(event.logical_time());
        self.version += 1;
        Ok(())
    }

    fn require(&self, caller: &Principal, capability: Capability) -> Result<()> {
        if !self.is_initialized() {
            return Err(RegistryError::NotInitialized);
        }
        match self.role_of(caller) {
            Some(role) if role.grants(capability) => Ok(()),
            _ => Err(RegistryError::Unauthorized { caller: caller.clone() }),
        }
    }

    fn check_time(&self, at: u64) -> Result<()> {
        if at < self.clock {
            return Err(RegistryError::NonMonotonicTime { last: self.clock, found: at });
        }
        Ok(())
    }

    fn check(&self, event: &RegistryEvent) -> Result<()> {
        match event {
            RegistryEvent::Initialized { owner } => {
                if self.is_initialized() {
                    return Err(RegistryError::AlreadyInitialized);
                }
                if owner.is_empty() {
                    return Err(RegistryError::InvalidArgument("owner must not be empty"));
                }
            }
            RegistryEvent::CertificateIssued { certificate } => {
                // Argument validation precedes authorization: an empty ID is rejected for every caller.
                if certificate.certificate_id.is_empty() {
                    return Err(RegistryError::InvalidArgument("certificate id must not be empty"));
                }
                self.require(&certificate.issuer, Capability::IssueCertificates)?;
                if self.certificates.contains_key(&certificate.certificate_id) {
                    return Err(RegistryError::AlreadyExists(certificate.certificate_id.clone()));
                }
                if !certificate.is_valid {
                    return Err(RegistryError::InvalidArgument("certificate must be issued valid"));
                }
                self.check_time(certificate.created_at)?;
            }
            RegistryEvent::CertificateRevoked { certificate_id, revoker, at } => {
                self.require(revoker, Capability::IssueCertificates)?;
                let cert = self
                    .certificates
                    .get(certificate_id)
                    .ok_or_else(|| RegistryError::NotFound(certificate_id.clone()))?;
                if !cert.is_valid {
                    return Err(RegistryError::AlreadyRevoked(certificate_id.clone()));
                }
                self.check_time(*at)?;
            }
            RegistryEvent::IssuerAuthorized { principal, by, at } => {
                self.require(by, Capability::ManageIssuers)?;
                if principal.is_empty() {
                    return Err(RegistryError::InvalidArgument("principal must not be empty"));
                }
                self.check_time(*at)?;
            }
            RegistryEvent::IssuerDeauthorized { principal, by, at } => {
                self.require(by, Capability::ManageIssuers)?;
                if self.owner.as_ref() == Some(principal) {
                    return Err(RegistryError::ProtectedPrincipal(principal.clone()));
                }
                self.check_time(*at)?;
            }
        }
        Ok(())
    }
}
