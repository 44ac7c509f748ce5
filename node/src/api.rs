// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use wipecert_kernel::event::AuditEvent;
use wipecert_kernel::proof::RegistryProof;
use wipecert_kernel::snapshot::blake3::to_hex;
use wipecert_kernel::types::certificate::IssueRequest;
use wipecert_kernel::types::id::{CertificateId, Principal};

use crate::persistence::SavedSnapshot;

/// Body of `POST /v1/certificates`. Only `certificate_id` is required; every other field
/// defaults to an empty string and is stored verbatim.
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct IssueCertificateRequest {
    pub certificate_id: String,
    pub device_path: String,
    pub device_model: String,
    pub device_serial: String,
    pub wipe_method: String,
    pub timestamp: String,
    pub system_hostname: String,
    pub tool_version: String,
    pub log_hash: String,
    pub content_reference: String,
}

impl From<IssueCertificateRequest> for IssueRequest {
    fn from(req: IssueCertificateRequest) -> Self {
        IssueRequest {
            certificate_id: CertificateId::new(req.certificate_id),
            device_path: req.device_path,
            device_model: req.device_model,
            device_serial: req.device_serial,
            wipe_method: req.wipe_method,
            timestamp: req.timestamp,
            system_hostname: req.system_hostname,
            tool_version: req.tool_version,
            log_hash: req.log_hash,
            content_reference: req.content_reference,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CertificateListResponse {
    pub certificate_ids: Vec<CertificateId>,
    pub total: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RevokeResponse {
    pub certificate_id: CertificateId,
    pub revoked: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct IssuerChangeRequest {
    pub principal: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IssuerChangeResponse {
    pub principal: Principal,
    /// False when the call was a no-op.
    pub changed: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IssuersResponse {
    pub owner: Option<Principal>,
    pub authorized: Vec<Principal>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuditHistoryResponse {
    pub events: Vec<AuditEvent>,
}

#[derive(Deserialize, Debug, Default)]
pub struct StreamParams {
    /// Replay committed events from this sequence before going live.
    pub from: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SnapshotSaveResponse {
    pub success: bool,
    pub path: String,
    pub event_height: u64,
    pub size_bytes: u64,
    pub snapshot_hash: String,
}

impl From<SavedSnapshot> for SnapshotSaveResponse {
    fn from(saved: SavedSnapshot) -> Self {
        Self {
            success: true,
            path: saved.path.to_string_lossy().to_string(),
            event_height: saved.event_height,
            size_bytes: saved.size,
            snapshot_hash: to_hex(&saved.hash),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProofResponse {
    pub kernel_version: u32,
    pub event_log_hash: String,       // hex-encoded BLAKE3
    pub final_state_hash: String,     // hex-encoded BLAKE3
    pub snapshot_hash: Option<String>, // hex-encoded BLAKE3 (if snapshot exists)
    pub event_count: u64,
}

impl From<RegistryProof> for ProofResponse {
    fn from(proof: RegistryProof) -> Self {
        Self {
            kernel_version: proof.kernel_version,
            event_log_hash: to_hex(&proof.event_log_hash),
            final_state_hash: to_hex(&proof.final_state_hash),
            snapshot_hash: (proof.snapshot_hash != [0u8; 32]).then(|| to_hex(&proof.snapshot_hash)),
            event_count: proof.event_count,
        }
    }
}
