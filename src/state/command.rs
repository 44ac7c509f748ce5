// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry commands: a caller's request before validation.

use crate::types::certificate::IssueRequest;
use crate::types::id::{CertificateId, Principal};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Initialize {
        owner: Principal,
    },
    Issue {
        caller: Principal,
        request: IssueRequest,
    },
    Revoke {
        caller: Principal,
        certificate_id: CertificateId,
    },
    AuthorizeIssuer {
        caller: Principal,
        principal: Principal,
    },
    DeauthorizeIssuer {
        caller: Principal,
        principal: Principal,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Initialize { .. } => "initialize",
            Command::Issue { .. } => "issue",
            Command::Revoke { .. } => "revoke",
            Command::AuthorizeIssuer { .. } => "authorize_issuer",
            Command::DeauthorizeIssuer { .. } => "deauthorize_issuer",
        }
    }
}
