// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event-Sourced Persistence Layer
//!
//! # Architecture
//! - Event Log = Primary truth (append-only, durable)
//! - Snapshots = Performance optimization (disposable)
//! - Journal = Committed history for audit queries
//!
//! # Guarantees
//! - Events are fsync'd before application
//! - Crash-symmetric recovery via replay
//! - No partial commits

pub mod event_log;
pub mod event_journal;
pub mod event_replay;
pub mod event_commit;
pub mod event_proof;

pub use event_log::EventLog;
pub use event_journal::EventJournal;
pub use event_replay::{replay_events, replay_tail};
pub use event_commit::{CommitError, CommitResult, EventCommitter};
pub use event_proof::ProofInputs;
