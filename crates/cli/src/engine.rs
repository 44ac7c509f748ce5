// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use wipecert_kernel::event::RegistryEvent;
use wipecert_kernel::replay::replay_onto;
use wipecert_kernel::state::kernel::RegistryState;
use wipecert_persistence::log::{read_log, LogScan};

/// Offline view of an event log: replays any prefix of it into a registry state.
pub struct ForensicEngine {
    pub scan: LogScan,
}

impl ForensicEngine {
    pub fn open(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();
        let scan = read_log(log_path)
            .with_context(|| format!("Failed to read event log {}", log_path.display()))?;
        Ok(Self { scan })
    }

    pub fn height(&self) -> u64 {
        self.scan.height()
    }

    pub fn events(&self) -> &[RegistryEvent] {
        &self.scan.events
    }

    /// State after the first `at` events, or after the whole log when `at` is `None`.
    /// A target past the end of the log is clamped to the end.
    pub fn state_at(&self, at: Option<u64>) -> Result<RegistryState> {
        let end = at.map_or(self.height(), |at| at.min(self.height())) as usize;
        replay_onto(RegistryState::new(), &self.scan.events[..end])
            .map_err(|f| anyhow!("Replay rejected event {}: {}", f.index, f.error))
    }
}
