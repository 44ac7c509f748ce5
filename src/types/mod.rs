// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry value types.

pub mod id;
pub mod certificate;
pub mod role;

pub use certificate::{Certificate, IssueRequest, Verification};
pub use id::{CertificateId, Principal};
pub use role::{Capability, Role};
