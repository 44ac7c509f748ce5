// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::broadcast;

use wipecert_kernel::event::{AuditEvent, RegistryEvent};
use wipecert_kernel::state::command::Command;
use wipecert_kernel::types::certificate::{Certificate, IssueRequest, Verification};
use wipecert_kernel::types::id::{CertificateId, Principal};

use crate::config::NodeConfig;
use crate::errors::EngineError;
use crate::events::{CommitResult, EventCommitter, ProofInputs};
use crate::persistence::{SavedSnapshot, SnapshotManager};
use crate::recovery::{recover, Recovered};

/// Source of host time, in seconds. The registry clamps it into a monotone logical clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_certificates: u64,
    pub owner: Option<Principal>,
    pub authorized_issuers: usize,
    pub event_height: u64,
    pub logical_clock: u64,
}

pub struct Engine {
    committer: EventCommitter,
    pub snapshot_path: Option<PathBuf>,

    // Verification
    pub current_snapshot_hash: Option<[u8; 32]>,

    clock: Box<dyn Clock>,
}

impl Engine {
    pub fn new(cfg: &NodeConfig) -> Result<Self, EngineError> {
        Self::with_clock(cfg, Box::new(SystemClock))
    }

    /// Recovers the ledger under `cfg.data_dir` (or starts in memory) and seeds the owner
    /// into an empty ledger.
    pub fn with_clock(cfg: &NodeConfig, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        let snapshot_path = cfg.snapshot_path();

        let recovered = match cfg.event_log_path() {
            Some(log_path) => {
                if let Some(dir) = &cfg.data_dir {
                    std::fs::create_dir_all(dir)?;
                }
                recover(&log_path, snapshot_path.as_deref())?
            }
            None => {
                tracing::warn!("No data directory configured. Ledger is in-memory only.");
                Recovered::in_memory()
            }
        };

        let Recovered { event_log, journal, state, snapshot_hash } = recovered;
        let committer = EventCommitter::new(event_log, journal, state, cfg.event_buffer);

        let mut engine = Self {
            committer,
            snapshot_path,
            current_snapshot_hash: snapshot_hash,
            clock,
        };
        engine.ensure_owner(cfg.owner.as_ref())?;

        tracing::info!(
            "Engine ready: {} events, {} certificates",
            engine.event_height(),
            engine.committer.live_state().total_certificates()
        );
        Ok(engine)
    }

    fn ensure_owner(&mut self, configured: Option<&Principal>) -> Result<(), EngineError> {
        match (self.committer.live_state().owner().cloned(), configured) {
            (Some(recorded), Some(configured)) if &recorded != configured => {
                tracing::warn!(
                    "Configured owner {} ignored: ledger already records owner {}",
                    configured,
                    recorded
                );
            }
            (Some(_), _) => {}
            (None, Some(owner)) => {
                tracing::info!("Initializing registry with owner {}", owner);
                self.commit(Command::Initialize { owner: owner.clone() })?;
            }
            (None, None) => {
                tracing::warn!("Registry has no owner and none is configured. Mutations will fail.");
            }
        }
        Ok(())
    }

    fn commit(&mut self, cmd: Command) -> Result<CommitResult, EngineError> {
        let now = self.clock.now();
        Ok(self.committer.commit(&cmd, now)?)
    }

    pub fn issue(&mut self, caller: Principal, request: IssueRequest) -> Result<Certificate, EngineError> {
        match self.commit(Command::Issue { caller, request })? {
            CommitResult::Committed {
                event: RegistryEvent::CertificateIssued { certificate },
                ..
            } => {
                tracing::info!("Certificate {} issued by {}", certificate.certificate_id, certificate.issuer);
                Ok(certificate)
            }
            other => {
                tracing::error!("Issue produced unexpected commit result {:?}", other);
                Err(EngineError::Internal)
            }
        }
    }

    pub fn revoke(&mut self, caller: Principal, certificate_id: CertificateId) -> Result<(), EngineError> {
        let revoker = caller.clone();
        self.commit(Command::Revoke { caller, certificate_id: certificate_id.clone() })?;
        tracing::info!("Certificate {} revoked by {}", certificate_id, revoker);
        Ok(())
    }

    /// Returns false when `principal` was already authorized.
    pub fn authorize_issuer(&mut self, caller: Principal, principal: Principal) -> Result<bool, EngineError> {
        let result = self.commit(Command::AuthorizeIssuer { caller, principal })?;
        Ok(matches!(result, CommitResult::Committed { .. }))
    }

    /// Returns false when `principal` was not authorized.
    pub fn deauthorize_issuer(&mut self, caller: Principal, principal: Principal) -> Result<bool, EngineError> {
        let result = self.commit(Command::DeauthorizeIssuer { caller, principal })?;
        Ok(matches!(result, CommitResult::Committed { .. }))
    }

    pub fn verify(&self, certificate_id: &CertificateId) -> Verification {
        self.committer.live_state().verify(certificate_id)
    }

    pub fn get_details(&self, certificate_id: &CertificateId) -> Result<Certificate, EngineError> {
        Ok(self.committer.live_state().get_details(certificate_id)?)
    }

    pub fn list_all(&self) -> Vec<CertificateId> {
        self.committer.live_state().list_all().to_vec()
    }

    pub fn list_by_issuer(&self, issuer: &Principal) -> Vec<CertificateId> {
        self.committer.live_state().list_by_issuer(issuer)
    }

    pub fn total_certificates(&self) -> u64 {
        self.committer.live_state().total_certificates()
    }

    pub fn owner(&self) -> Option<Principal> {
        self.committer.live_state().owner().cloned()
    }

    pub fn is_authorized(&self, principal: &Principal) -> bool {
        self.committer.live_state().is_authorized(principal)
    }

    pub fn authorized_issuers(&self) -> Vec<Principal> {
        self.committer.live_state().authorized_issuers()
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.committer.live_state();
        RegistryStats {
            total_certificates: state.total_certificates(),
            owner: state.owner().cloned(),
            authorized_issuers: state.authorized_issuers().len(),
            event_height: self.event_height(),
            logical_clock: state.clock(),
        }
    }

    pub fn certificate_history(&self, certificate_id: &CertificateId) -> Vec<AuditEvent> {
        self.committer.journal().for_certificate(certificate_id)
    }

    pub fn principal_history(&self, principal: &Principal) -> Vec<AuditEvent> {
        self.committer.journal().for_principal(principal)
    }

    /// Committed history from `from` (if given) plus a receiver for everything after it.
    ///
    /// Both are taken under the same borrow, so nothing is missed or seen twice.
    pub fn subscribe_from(&self, from: Option<u64>) -> (Vec<AuditEvent>, broadcast::Receiver<AuditEvent>) {
        let history = from
            .map(|from| self.committer.journal().audit_since(from))
            .unwrap_or_default();
        (history, self.committer.subscribe())
    }

    pub fn event_height(&self) -> u64 {
        self.committer.event_log().height()
    }

    pub fn event_log_path(&self) -> Option<&Path> {
        self.committer.event_log().path()
    }

    pub fn save_snapshot(&mut self) -> Result<SavedSnapshot, EngineError> {
        let path = self
            .snapshot_path
            .clone()
            .ok_or_else(|| EngineError::InvalidInput("No snapshot path configured".to_string()))?;

        let saved = SnapshotManager::save(&path, self.committer.live_state(), self.clock.now())?;
        self.current_snapshot_hash = Some(saved.hash);
        tracing::info!("Snapshot saved to {:?} at height {}", saved.path, saved.event_height);
        Ok(saved)
    }

    /// Snapshot of everything a proof covers. Call `generate` on the result once the
    /// engine lock is released; it reads the log file.
    pub fn proof_inputs(&self) -> ProofInputs {
        let event_log = self
            .committer
            .event_log()
            .committed_extent()
            .map(|(path, len)| (path.to_path_buf(), len));

        ProofInputs::capture(
            self.committer.live_state(),
            self.current_snapshot_hash,
            event_log,
            self.event_height(),
        )
    }
}
