// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event log file format.
//!
//! ```text
//! [Header: 16 bytes][Frame][Frame]...
//!
//! Header: magic "WCEL" | version u32 LE | reserved u64
//! Frame:  sequence u64 LE | payload_len u32 LE | crc64 u64 LE | bincode(RegistryEvent)
//! ```
//!
//! The checksum covers sequence, payload length and payload. Sequences start at 0 and
//! are contiguous. An incomplete final frame is a torn tail left by a crash mid-append:
//! readers stop before it and writers cut it off. A complete frame that fails its
//! checksum, or breaks the sequence, is corruption and fails the read.

use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{BufMut, Bytes, BytesMut};
use crc64fast::Digest;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use wipecert_kernel::event::RegistryEvent;

pub const LOG_MAGIC: [u8; 4] = *b"WCEL";
pub const LOG_VERSION: u32 = 1;

/// Upper bound on a single event payload. Writers refuse anything larger and readers
/// treat a larger length field as corruption.
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub reserved: u64,
}

impl LogHeader {
    pub const SIZE: usize = 4 + 4 + 8; // 16 bytes

    pub fn new() -> Self {
        Self {
            magic: LOG_MAGIC,
            version: LOG_VERSION,
            reserved: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != LOG_MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != LOG_VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let reserved = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            magic,
            version,
            reserved,
        })
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub sequence: u64,
    pub payload_len: u32,
    pub checksum: u64,
}

impl FrameHeader {
    pub const SIZE: usize = 8 + 4 + 8; // 20 bytes

    pub fn from_bytes(mut buf: &[u8]) -> Result<Self> {
        Ok(Self {
            sequence: buf.read_u64::<LittleEndian>()?,
            payload_len: buf.read_u32::<LittleEndian>()?,
            checksum: buf.read_u64::<LittleEndian>()?,
        })
    }
}

pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

pub fn frame_checksum(sequence: u64, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&sequence.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

/// Header plus payload, ready to append.
pub fn encode_frame(sequence: u64, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload.len());
    buf.put_u64_le(sequence);
    buf.put_u32_le(payload.len() as u32);
    buf.put_u64_le(frame_checksum(sequence, payload));
    buf.put_slice(payload);
    buf.freeze()
}

pub fn encode_event(event: &RegistryEvent) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(event, bincode::config::standard())
        .map_err(|e| PersistenceError::InvalidFormat(format!("event encode: {}", e)))
}

/// Encodes `event` and checks it fits in a single frame.
pub fn encode_frame_payload(event: &RegistryEvent) -> Result<Vec<u8>> {
    let payload = encode_event(event)?;
    if payload.len() > MAX_PAYLOAD_LEN as usize {
        return Err(PersistenceError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(payload)
}

pub fn decode_event(payload: &[u8]) -> Result<RegistryEvent> {
    let (event, read): (RegistryEvent, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| PersistenceError::InvalidFormat(format!("event decode: {}", e)))?;
    if read != payload.len() {
        return Err(PersistenceError::InvalidFormat("trailing bytes in event payload".to_string()));
    }
    Ok(event)
}

/// Fills `buf` as far as the reader allows. Returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Iterates the frames that follow a log header.
pub struct FrameReader<R: Read> {
    reader: R,
    next_sequence: u64,
    consumed: u64,
    torn: bool,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_sequence: 0,
            consumed: 0,
            torn: false,
            done: false,
        }
    }

    /// Bytes of complete, verified frames read so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// True once the reader stopped at an incomplete final frame.
    pub fn torn_tail(&self) -> bool {
        self.torn
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut header_buf = [0u8; FrameHeader::SIZE];
        let n = read_full(&mut self.reader, &mut header_buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n < FrameHeader::SIZE {
            self.torn = true;
            return Ok(None);
        }

        let header = FrameHeader::from_bytes(&header_buf)?;
        if header.payload_len > MAX_PAYLOAD_LEN {
            return Err(PersistenceError::InvalidFormat(format!(
                "frame {} claims {} payload bytes",
                header.sequence, header.payload_len
            )));
        }

        let mut payload = vec![0u8; header.payload_len as usize];
        if read_full(&mut self.reader, &mut payload)? < payload.len() {
            self.torn = true;
            return Ok(None);
        }

        let found = frame_checksum(header.sequence, &payload);
        if found != header.checksum {
            return Err(PersistenceError::ChecksumMismatch {
                expected: header.checksum,
                found,
            });
        }
        if header.sequence != self.next_sequence {
            return Err(PersistenceError::SequenceGap {
                expected: self.next_sequence,
                found: header.sequence,
            });
        }

        self.next_sequence += 1;
        self.consumed += (FrameHeader::SIZE + payload.len()) as u64;
        Ok(Some(Frame { header, payload }))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Contents of an event log file.
#[derive(Debug, Default)]
pub struct LogScan {
    /// Decoded events; `events[i]` carries sequence `i`.
    pub events: Vec<RegistryEvent>,
    /// Length of the header plus every complete frame.
    pub valid_len: u64,
    /// Bytes past `valid_len` belonging to a torn final frame (or a torn header).
    pub torn_bytes: u64,
}

impl LogScan {
    pub fn height(&self) -> u64 {
        self.events.len() as u64
    }
}

/// Reads and verifies a whole event log.
pub fn read_log(path: impl AsRef<Path>) -> Result<LogScan> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if file_len < LogHeader::SIZE as u64 {
        // Crash while the header itself was being written.
        return Ok(LogScan {
            events: Vec::new(),
            valid_len: 0,
            torn_bytes: file_len,
        });
    }

    let mut reader = BufReader::new(file);
    LogHeader::read_from(&mut reader)?;

    let mut frames = FrameReader::new(reader);
    let mut events = Vec::new();
    for frame in &mut frames {
        let frame = frame?;
        events.push(decode_event(&frame.payload)?);
    }

    let valid_len = LogHeader::SIZE as u64 + frames.consumed();
    Ok(LogScan {
        events,
        valid_len,
        torn_bytes: file_len - valid_len,
    })
}

/// Append-only writer. Every append is fsync'd before it returns.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    /// File length covering every committed frame.
    committed_len: u64,
    poisoned: bool,
}

impl LogWriter {
    /// Opens `path`, creating it with a fresh header when missing.
    ///
    /// An existing log is verified in full. A torn tail is cut off so the next frame
    /// follows the last complete one; the returned scan reports how many bytes went.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, LogScan)> {
        let path = path.as_ref().to_path_buf();
        let scan = if path.exists() {
            read_log(&path)?
        } else {
            LogScan::default()
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        if scan.valid_len < LogHeader::SIZE as u64 {
            file.set_len(0)?;
            file.write_all(&LogHeader::new().to_bytes())?;
            file.sync_all()?;
        } else if scan.torn_bytes > 0 {
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }
        let committed_len = file.seek(SeekFrom::End(0))?;

        let writer = Self {
            path,
            file,
            next_sequence: scan.height(),
            committed_len,
            poisoned: false,
        };
        Ok((writer, scan))
    }

    /// Appends one event and returns its sequence number.
    ///
    /// On error the file is cut back to its last committed frame, so a failed append
    /// leaves no bytes behind. If that cut fails too, the writer refuses further
    /// appends until the log is reopened.
    pub fn append(&mut self, event: &RegistryEvent) -> Result<u64> {
        if self.poisoned {
            return Err(PersistenceError::WriterPoisoned);
        }

        let payload = encode_frame_payload(event)?;
        let sequence = self.next_sequence;
        let frame = encode_frame(sequence, &payload);

        if let Err(e) = self.write_frame(&frame) {
            if self.discard_uncommitted().is_err() {
                self.poisoned = true;
            }
            return Err(e);
        }

        self.next_sequence += 1;
        self.committed_len += frame.len() as u64;
        Ok(sequence)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.file.write_all(frame)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Cuts anything past the last committed frame and moves the cursor back to it.
    fn discard_uncommitted(&mut self) -> Result<()> {
        self.file.set_len(self.committed_len)?;
        self.file.sync_all()?;
        self.file.seek(SeekFrom::Start(self.committed_len))?;
        Ok(())
    }

    /// Header plus every committed frame, in bytes.
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    /// True once a failed append could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of events in the log.
    pub fn height(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wipecert_kernel::types::id::Principal;

    fn init_event() -> RegistryEvent {
        RegistryEvent::Initialized { owner: Principal::from("0xOWNER") }
    }

    fn authorize_event(name: &str, at: u64) -> RegistryEvent {
        RegistryEvent::IssuerAuthorized {
            principal: Principal::from(name),
            by: Principal::from("0xOWNER"),
            at,
        }
    }

    #[test]
    fn test_frame_header_layout() {
        let frame = encode_frame(7, b"hello world");
        assert_eq!(frame.len(), FrameHeader::SIZE + 11);

        let header = FrameHeader::from_bytes(&frame[..FrameHeader::SIZE]).unwrap();
        assert_eq!(header.sequence, 7);
        assert_eq!(header.payload_len, 11);
        assert_eq!(header.checksum, frame_checksum(7, b"hello world"));
    }

    #[test]
    fn test_append_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let (mut writer, scan) = LogWriter::open(&path).unwrap();
            assert_eq!(scan.height(), 0);
            assert_eq!(writer.append(&init_event()).unwrap(), 0);
            for i in 1..5 {
                assert_eq!(writer.append(&authorize_event(&format!("P{}", i), i)).unwrap(), i);
            }
        }

        let (writer, scan) = LogWriter::open(&path).unwrap();
        assert_eq!(writer.height(), 5);
        assert_eq!(scan.events[0], init_event());
        assert_eq!(scan.events[3], authorize_event("P3", 3));
        assert_eq!(scan.torn_bytes, 0);
    }

    #[test]
    fn test_torn_tail_is_cut_and_log_stays_appendable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        {
            let (mut writer, _) = LogWriter::open(&path).unwrap();
            writer.append(&init_event()).unwrap();
            writer.append(&authorize_event("P1", 1)).unwrap();
        }
        let full_len = std::fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full_len - 3).unwrap();
        drop(file);

        let scan = read_log(&path).unwrap();
        assert_eq!(scan.height(), 1);
        assert!(scan.torn_bytes > 0);

        let (mut writer, scan) = LogWriter::open(&path).unwrap();
        assert_eq!(scan.height(), 1);
        assert_eq!(writer.append(&authorize_event("P2", 2)).unwrap(), 1);
        drop(writer);

        let scan = read_log(&path).unwrap();
        assert_eq!(scan.events, vec![init_event(), authorize_event("P2", 2)]);
        assert_eq!(scan.torn_bytes, 0);
    }

    #[test]
    fn test_checksum_mismatch_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        {
            let (mut writer, _) = LogWriter::open(&path).unwrap();
            writer.append(&init_event()).unwrap();
            writer.append(&authorize_event("P1", 1)).unwrap();
        }

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read_log(&path), Err(PersistenceError::ChecksumMismatch { .. })));
        assert!(LogWriter::open(&path).is_err());
    }

    #[test]
    fn test_sequence_gap_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut bytes = LogHeader::new().to_bytes().to_vec();
        bytes.extend_from_slice(&encode_frame(0, &encode_event(&init_event()).unwrap()));
        bytes.extend_from_slice(&encode_frame(2, &encode_event(&authorize_event("P1", 1)).unwrap()));
        std::fs::write(&path, &bytes).unwrap();

        match read_log(&path) {
            Err(PersistenceError::SequenceGap { expected, found }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected sequence gap, got {:?}", other.map(|s| s.height())),
        }
    }

    #[test]
    fn test_invalid_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let mut bytes = LogHeader::new().to_bytes();
        bytes[0..4].copy_from_slice(b"BADM");
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(read_log(&path), Err(PersistenceError::InvalidMagic)));
    }

    #[test]
    fn test_oversized_event_is_refused_before_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let (mut writer, _) = LogWriter::open(&path).unwrap();
        writer.append(&init_event()).unwrap();
        let len_before = std::fs::metadata(&path).unwrap().len();

        let huge = authorize_event(&"x".repeat(MAX_PAYLOAD_LEN as usize + 1), 1);
        match writer.append(&huge) {
            Err(PersistenceError::PayloadTooLarge { len, max }) => {
                assert!(len > max as usize);
                assert_eq!(max, MAX_PAYLOAD_LEN);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }

        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
        assert_eq!(writer.height(), 1);
        assert_eq!(writer.append(&authorize_event("P1", 1)).unwrap(), 1);
        drop(writer);
        assert_eq!(read_log(&path).unwrap().height(), 2);
    }

    #[test]
    fn test_partial_frame_is_rolled_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let (mut writer, _) = LogWriter::open(&path).unwrap();
        writer.append(&init_event()).unwrap();
        let committed = std::fs::metadata(&path).unwrap().len();

        // Half a frame, as left by a write that ran out of space.
        let frame = encode_frame(1, &encode_event(&authorize_event("P1", 1)).unwrap());
        writer.file.write_all(&frame[..frame.len() / 2]).unwrap();
        writer.discard_uncommitted().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), committed);

        assert_eq!(writer.append(&authorize_event("P2", 2)).unwrap(), 1);
        drop(writer);

        let scan = read_log(&path).unwrap();
        assert_eq!(scan.events, vec![init_event(), authorize_event("P2", 2)]);
        assert_eq!(scan.torn_bytes, 0);
    }

    #[test]
    fn test_failed_append_without_rollback_poisons_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let (mut writer, _) = LogWriter::open(&path).unwrap();
        writer.append(&init_event()).unwrap();

        // A read-only handle fails both the write and the truncate that would undo it.
        writer.file = File::open(&path).unwrap();
        assert!(matches!(writer.append(&authorize_event("P1", 1)), Err(PersistenceError::IoError(_))));
        assert!(writer.is_poisoned());
        assert_eq!(writer.height(), 1);
        assert!(matches!(
            writer.append(&authorize_event("P2", 2)),
            Err(PersistenceError::WriterPoisoned)
        ));
        drop(writer);

        let (mut writer, scan) = LogWriter::open(&path).unwrap();
        assert_eq!(scan.events, vec![init_event()]);
        assert_eq!(writer.append(&authorize_event("P3", 3)).unwrap(), 1);
    }

    #[test]
    fn test_torn_header_is_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        std::fs::write(&path, b"WCE").unwrap();

        let (mut writer, scan) = LogWriter::open(&path).unwrap();
        assert_eq!(scan.torn_bytes, 3);
        writer.append(&init_event()).unwrap();
        drop(writer);

        assert_eq!(read_log(&path).unwrap().events, vec![init_event()]);
    }
}
