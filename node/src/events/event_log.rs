// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log
//!
//! This is the CANONICAL durability layer.
//! - Events are written to disk BEFORE memory application
//! - Every write is fsync'd for crash safety
//! - No truncation or rewriting, apart from cutting a torn tail on open
//!
//! The frame format lives in `wipecert_persistence::log`. A node started without a
//! data directory keeps an in-memory log that only counts sequences.

use std::path::Path;

use wipecert_kernel::event::RegistryEvent;
use wipecert_persistence::log::{encode_frame_payload, LogScan, LogWriter};
use wipecert_persistence::Result;

pub enum EventLog {
    Durable(LogWriter),
    Memory { height: u64 },
}

impl EventLog {
    /// Opens the log at `path` and returns its verified contents.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, LogScan)> {
        let (writer, scan) = LogWriter::open(path)?;
        if scan.torn_bytes > 0 {
            tracing::warn!(
                "Discarded {} bytes of incomplete frame at end of {:?}",
                scan.torn_bytes,
                writer.path()
            );
        }
        Ok((EventLog::Durable(writer), scan))
    }

    pub fn in_memory() -> Self {
        EventLog::Memory { height: 0 }
    }

    /// Persists one event. Returns its sequence only after the write is durable.
    ///
    /// The in-memory log applies the same frame size limit, so a node behaves the same
    /// with or without a data directory.
    pub fn append(&mut self, event: &RegistryEvent) -> Result<u64> {
        match self {
            EventLog::Durable(writer) => writer.append(event),
            EventLog::Memory { height } => {
                encode_frame_payload(event)?;
                let sequence = *height;
                *height += 1;
                Ok(sequence)
            }
        }
    }

    /// Number of events in the log.
    pub fn height(&self) -> u64 {
        match self {
            EventLog::Durable(writer) => writer.height(),
            EventLog::Memory { height } => *height,
        }
    }

    /// Log file and the length of its committed frames.
    pub fn committed_extent(&self) -> Option<(&Path, u64)> {
        match self {
            EventLog::Durable(writer) => Some((writer.path(), writer.committed_len())),
            EventLog::Memory { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            EventLog::Durable(writer) => Some(writer.path()),
            EventLog::Memory { .. } => None,
        }
    }
}
