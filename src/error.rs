// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::types::id::{CertificateId, Principal};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Caller does not hold the capability the operation requires.
    #[error("principal `{caller}` is not authorized for this operation")]
    Unauthorized { caller: Principal },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("certificate `{0}` already exists")]
    AlreadyExists(CertificateId),

    #[error("certificate `{0}` not found")]
    NotFound(CertificateId),

    #[error("certificate `{0}` is already revoked")]
    AlreadyRevoked(CertificateId),

    /// The owner can never be removed from the authorized set.
    #[error("principal `{0}` is the registry owner and cannot be deauthorized")]
    ProtectedPrincipal(Principal),

    #[error("registry has not been initialized with an owner")]
    NotInitialized,

    #[error("registry is already initialized")]
    AlreadyInitialized,

    /// An event carries a logical time earlier than one already applied.
    #[error("logical time went backwards: last {last}, event {found}")]
    NonMonotonicTime { last: u64, found: u64 },

    #[error("codec error: {0}")]
    Codec(String),
}

impl RegistryError {
    /// Stable machine-readable name, used for metric labels and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Unauthorized { .. } => "Unauthorized",
            RegistryError::InvalidArgument(_) => "InvalidArgument",
            RegistryError::AlreadyExists(_) => "AlreadyExists",
            RegistryError::NotFound(_) => "NotFound",
            RegistryError::AlreadyRevoked(_) => "AlreadyRevoked",
            RegistryError::ProtectedPrincipal(_) => "ProtectedPrincipal",
            RegistryError::NotInitialized => "NotInitialized",
            RegistryError::AlreadyInitialized => "AlreadyInitialized",
            RegistryError::NonMonotonicTime { .. } => "NonMonotonicTime",
            RegistryError::Codec(_) => "Codec",
        }
    }
}

pub type RegistryResult<T> = core::result::Result<T, RegistryError>;
pub type Result<T> = RegistryResult<T>;
