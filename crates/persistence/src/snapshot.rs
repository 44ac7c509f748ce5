// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot container.
//!
//! ```text
//! [Header: 48 bytes][Body: encoded RegistryState][CRC32 of header + body: u32 LE]
//! ```
//!
//! `event_height` is the number of log events folded into the body; recovery replays
//! the log from that sequence onward.

use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use crc32fast::Hasher;
use std::fs;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub event_height: u64,
    pub timestamp: u64,
    /// Leading 16 bytes of the BLAKE3 state hash of the body.
    pub state_hash: [u8; 16],
    pub reserved: [u8; 8],
}

impl SnapshotHeader {
    pub const SIZE: usize = 4 + 4 + 8 + 8 + 16 + 8; // 48 bytes
    pub const MAGIC: [u8; 4] = *b"WCSN";
    pub const VERSION: u32 = 1;

    pub fn new(event_height: u64, timestamp: u64, state_hash: [u8; 16]) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            event_height,
            timestamp,
            state_hash,
            reserved: [0; 8],
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.event_height.to_le_bytes());
        buf[16..24].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[24..40].copy_from_slice(&self.state_hash);
        buf[40..48].copy_from_slice(&self.reserved);
        buf
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != Self::MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let event_height = reader.read_u64::<LittleEndian>()?;
        let timestamp = reader.read_u64::<LittleEndian>()?;

        let mut state_hash = [0u8; 16];
        reader.read_exact(&mut state_hash)?;
        let mut reserved = [0u8; 8];
        reader.read_exact(&mut reserved)?;

        Ok(Self {
            magic,
            version,
            event_height,
            timestamp,
            state_hash,
            reserved,
        })
    }
}

/// Serializes a complete snapshot file image.
pub fn encode_snapshot(header: &SnapshotHeader, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SnapshotHeader::SIZE + body.len() + 4);
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(body);

    let mut hasher = Hasher::new();
    hasher.update(&buf);
    buf.extend_from_slice(&hasher.finalize().to_le_bytes());
    buf
}

/// Verifies the trailer and splits a snapshot image into header and body.
pub fn decode_snapshot(buf: &[u8]) -> Result<(SnapshotHeader, Vec<u8>)> {
    if buf.len() < SnapshotHeader::SIZE + 4 {
        return Err(PersistenceError::InvalidFormat("snapshot too short".to_string()));
    }

    let (content, mut trailer) = buf.split_at(buf.len() - 4);
    let stored = trailer.read_u32::<LittleEndian>()?;

    let mut hasher = Hasher::new();
    hasher.update(content);
    let computed = hasher.finalize();
    if computed != stored {
        return Err(PersistenceError::ChecksumMismatch {
            expected: stored as u64,
            found: computed as u64,
        });
    }

    let header = SnapshotHeader::read_from(&content[..SnapshotHeader::SIZE])?;
    Ok((header, content[SnapshotHeader::SIZE..].to_vec()))
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<(SnapshotHeader, Vec<u8>)> {
    let buf = fs::read(path)?;
    decode_snapshot(&buf)
}

/// Reads only the header, without verifying the trailer.
pub fn read_header(path: impl AsRef<Path>) -> Result<SnapshotHeader> {
    let file = fs::File::open(path)?;
    SnapshotHeader::read_from(file)
}
