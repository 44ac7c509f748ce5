// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Certificate records and their read views.

use serde::{Deserialize, Serialize};
use crate::types::id::{CertificateId, Principal};

/// Caller-supplied fields of a new certificate.
///
/// Every string is stored verbatim. The registry never normalizes, parses or
/// dereferences them (`log_hash` and `content_reference` point at off-registry artifacts).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub certificate_id: CertificateId,
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

/// A stored certificate. Immutable after issuance except for `is_valid`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_id: CertificateId,
    pub device_path: String,
    pub device_model: String,
    pub device_serial: String,
    pub wipe_method: String,
    pub timestamp: String,
    pub system_hostname: String,
    pub tool_version: String,
    pub log_hash: String,
    pub content_reference: String,
    pub issuer: Principal,
    /// Registry-assigned logical time of insertion.
    pub created_at: u64,
    pub is_valid: bool,
}

impl Certificate {
    /// Builds the record for a fresh issuance. Validity always starts `true`.
    pub fn issue(req: IssueRequest, issuer: Principal, created_at: u64) -> Self {
        Self {
            certificate_id: req.certificate_id,
            device_path: req.device_path,
            device_model: req.device_model,
            device_serial: req.device_serial,
            wipe_method: req.wipe_method,
            timestamp: req.timestamp,
            system_hostname: req.system_hostname,
            tool_version: req.tool_version,
            log_hash: req.log_hash,
            content_reference: req.content_reference,
            issuer,
            created_at,
            is_valid: true,
        }
    }
}

/// Narrow read path for verifiers. Never an error: a missing certificate is `exists = false`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub exists: bool,
    pub is_valid: bool,
    pub device_serial: String,
    pub wipe_method: String,
    pub timestamp: String,
    pub content_reference: String,
    pub issuer: Principal,
    pub created_at: u64,
}

impl Verification {
    pub fn missing() -> Self {
        Self::default()
    }
}

impl From<&Certificate> for Verification {
    fn from(cert: &Certificate) -> Self {
        Self {
            exists: true,
            is_valid: cert.is_valid,
            device_serial: cert.device_serial.clone(),
            wipe_method: cert.wipe_method.clone(),
            timestamp: cert.timestamp.clone(),
            content_reference: cert.content_reference.clone(),
            issuer: cert.issuer.clone(),
            created_at: cert.created_at,
        }
    }
}
