// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch {
        expected: u64,
        found: u64,
    },
    /// A complete frame whose sequence does not follow its predecessor.
    #[error("Sequence gap: expected {expected}, found {found}")]
    SequenceGap {
        expected: u64,
        found: u64,
    },
    /// An event too large to frame. Nothing was written.
    #[error("Event payload of {len} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge {
        len: usize,
        max: u32,
    },
    /// An earlier append failed and its partial frame could not be removed.
    #[error("Log writer is unusable after a failed append; reopen the log")]
    WriterPoisoned,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
