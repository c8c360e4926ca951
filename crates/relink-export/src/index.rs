//! The local chunk index.
//!
//! Records live in a single log file inside the index directory:
//!
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized IndexRecord)]
//! ```
//!
//! Opening the index scans the log once and keeps an address-ordered map of
//! record offsets; record data is read back only while iterating.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExportError, ExportResult};

/// Name of the log file inside an index directory.
pub const INDEX_FILE: &str = "retrieval.idx";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One stored chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub address: Vec<u8>,
    pub data: Vec<u8>,
    /// Unix time the chunk was stored at.
    pub stored_at: i64,
    pub bin_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// The index must exist; writes are rejected.
    ReadOnly,
    /// The index is created if missing.
    ReadWrite,
}

/// Address-ordered chunk index backed by a checksummed record log.
pub struct ChunkIndex {
    path: PathBuf,
    file: File,
    mode: OpenMode,
    /// Latest record offset per address.
    offsets: BTreeMap<Vec<u8>, u64>,
    /// End of the log.
    end: u64,
}

impl std::fmt::Debug for ChunkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkIndex")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("records", &self.offsets.len())
            .finish()
    }
}

impl ChunkIndex {
    /// Open the index stored in directory `dir`.
    pub fn open(dir: &Path, mode: OpenMode) -> ExportResult<Self> {
        let path = dir.join(INDEX_FILE);
        let file = match mode {
            OpenMode::ReadOnly => {
                if !path.is_file() {
                    return Err(ExportError::InvalidSource {
                        path: dir.to_path_buf(),
                        reason: format!("no {INDEX_FILE} found"),
                    });
                }
                File::open(&path)?
            }
            OpenMode::ReadWrite => {
                fs::create_dir_all(dir)?;
                OpenOptions::new()
                    .create(true)
                    .read(true)
                    .append(true)
                    .open(&path)?
            }
        };

        let (offsets, end) = scan(&file)?;
        debug!(path = %path.display(), records = offsets.len(), bytes = end, "chunk index opened");
        Ok(Self {
            path,
            file,
            mode,
            offsets,
            end,
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct addresses.
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    pub fn contains(&self, address: &[u8]) -> bool {
        self.offsets.contains_key(address)
    }

    /// Append a record. A later record for the same address replaces the
    /// earlier one.
    pub fn put(&mut self, record: &IndexRecord) -> ExportResult<()> {
        if self.mode == OpenMode::ReadOnly {
            return Err(ExportError::ReadOnly);
        }
        let payload =
            bincode::serialize(record).map_err(|e| ExportError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| ExportError::Serialization(format!("record of {} bytes", payload.len())))?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);
        (&self.file).write_all(&frame)?;

        self.offsets.insert(record.address.clone(), self.end);
        self.end += frame.len() as u64;
        Ok(())
    }

    /// Flush written records to disk.
    pub fn sync(&self) -> ExportResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Visit every record in ascending address order.
    pub fn iterate<F>(&self, mut visit: F) -> ExportResult<()>
    where
        F: FnMut(IndexRecord) -> ExportResult<()>,
    {
        for &offset in self.offsets.values() {
            visit(self.read_at(offset)?)?;
        }
        Ok(())
    }

    fn read_at(&self, offset: u64) -> ExportResult<IndexRecord> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let (length, crc) = parse_header(&header);
        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        decode(offset, crc, &payload)
    }
}

fn parse_header(header: &[u8; HEADER_SIZE]) -> (u32, u32) {
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (length, crc)
}

fn decode(offset: u64, expected_crc: u32, payload: &[u8]) -> ExportResult<IndexRecord> {
    let actual = crc32fast::hash(payload);
    if actual != expected_crc {
        return Err(ExportError::IndexCorrupted {
            offset,
            reason: format!("crc mismatch: expected {expected_crc:#010x}, got {actual:#010x}"),
        });
    }
    bincode::deserialize(payload).map_err(|e| ExportError::IndexCorrupted {
        offset,
        reason: e.to_string(),
    })
}

/// Read the whole log front to back. Any torn or corrupted record is an
/// error; the index is never silently truncated.
fn scan(file: &File) -> ExportResult<(BTreeMap<Vec<u8>, u64>, u64)> {
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;
    let mut offsets = BTreeMap::new();
    let mut offset = 0u64;

    while offset < file_len {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ExportError::IndexCorrupted {
                    offset,
                    reason: "truncated record header".into(),
                })
            }
            Err(e) => return Err(e.into()),
        }
        let (length, crc) = parse_header(&header);
        let next = offset + HEADER_SIZE as u64 + u64::from(length);
        if length == 0 || next > file_len {
            return Err(ExportError::IndexCorrupted {
                offset,
                reason: format!("invalid record length {length}"),
            });
        }
        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload)?;
        let record = decode(offset, crc, &payload)?;
        offsets.insert(record.address, offset);
        offset = next;
    }
    Ok((offsets, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(addr: u8, data: &[u8]) -> IndexRecord {
        IndexRecord {
            address: vec![addr; 32],
            data: data.to_vec(),
            stored_at: 1_700_000_000 + i64::from(addr),
            bin_id: u64::from(addr),
        }
    }

    fn addresses(index: &ChunkIndex) -> Vec<u8> {
        let mut out = Vec::new();
        index
            .iterate(|r| {
                out.push(r.address[0]);
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn put_and_iterate_in_address_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
        for addr in [5u8, 1, 9, 3] {
            index.put(&record(addr, &[addr; 10])).unwrap();
        }
        assert_eq!(index.count(), 4);
        assert_eq!(addresses(&index), vec![1, 3, 5, 9]);
    }

    #[test]
    fn reopen_sees_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
            index.put(&record(2, b"two")).unwrap();
            index.put(&record(1, b"one")).unwrap();
            index.sync().unwrap();
        }
        let index = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap();
        let mut seen = Vec::new();
        index
            .iterate(|r| {
                seen.push(r);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![record(1, b"one"), record(2, b"two")]);
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
        index.put(&record(7, b"old")).unwrap();
        index.put(&record(7, b"new")).unwrap();
        assert_eq!(index.count(), 1);
        drop(index);

        let index = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap();
        index
            .iterate(|r| {
                assert_eq!(r.data, b"new");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn read_only_requires_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChunkIndex::open(&dir.path().join("nope"), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSource { .. }));
        // a directory without the log file is not an index either
        let err = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSource { .. }));
    }

    #[test]
    fn read_only_rejects_put() {
        let dir = tempfile::tempdir().unwrap();
        ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
        let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap();
        assert!(matches!(index.put(&record(1, b"x")), Err(ExportError::ReadOnly)));
    }

    #[test]
    fn corrupted_payload_detected() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
            index.put(&record(1, b"first")).unwrap();
            index.put(&record(2, b"second")).unwrap();
        }
        let path = dir.path().join(INDEX_FILE);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let err = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, ExportError::IndexCorrupted { offset, .. } if offset > 0));
    }

    #[test]
    fn truncated_log_detected() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
            index.put(&record(1, b"first")).unwrap();
        }
        let path = dir.path().join(INDEX_FILE);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let err = ChunkIndex::open(dir.path(), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, ExportError::IndexCorrupted { offset: 0, .. }));
    }

    #[test]
    fn iterate_stops_on_visitor_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = ChunkIndex::open(dir.path(), OpenMode::ReadWrite).unwrap();
        for addr in 1..=3u8 {
            index.put(&record(addr, b"x")).unwrap();
        }
        let mut visited = 0;
        let result = index.iterate(|_| {
            visited += 1;
            Err(ExportError::ReadOnly)
        });
        assert!(result.is_err());
        assert_eq!(visited, 1);
    }
}
