// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Roles and the capabilities they grant.

use serde::{Deserialize, Serialize};

/// What an operation needs from its caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// Issue and revoke certificates.
    IssueCertificates,
    /// Add or remove principals from the authorized set.
    ManageIssuers,
}

/// Role held by a principal. `Owner` is a superset of `Issuer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Issuer,
}

impl Role {
    pub fn grants(self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Owner, _) => true,
            (Role::Issuer, Capability::IssueCertificates) => true,
            (Role::Issuer, Capability::ManageIssuers) => false,
        }
    }
}
