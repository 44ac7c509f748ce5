// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! On-disk formats of a wipecert ledger: the framed event log and the snapshot container.

pub mod error;
pub mod log;
pub mod snapshot;
pub mod fixtures;

pub use error::{PersistenceError, Result};
