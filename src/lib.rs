// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! wipecert-kernel: a deterministic certificate registry for data-sanitization events.
//!
//! The kernel owns the registry state machine. It performs no I/O: callers turn a
//! [`state::command::Command`] into a [`event::RegistryEvent`] with
//! [`state::kernel::RegistryState::prepare`], persist the event, then apply it.

pub mod config;
pub mod error;
pub mod types;
pub mod state;
pub mod event;
pub mod snapshot;
pub mod proof;
pub mod replay;

#[cfg(test)]
pub mod tests;
