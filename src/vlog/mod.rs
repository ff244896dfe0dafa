//! Append-only value log.
//!
//! The SST stores only fixed-size index records; the actual value bytes
//! live here. Each value is framed as a CRC-protected record and addressed
//! by the `(offset, vlen)` pair the SST carries.
//!
//! # On-disk layout
//!
//! ```text
//! [MAGIC][VERSION][HEADER_CRC32_LE]
//! [VALUE_LEN_LE][VALUE_BYTES][VALUE_CRC32_LE]
//! [VALUE_LEN_LE][VALUE_BYTES][VALUE_CRC32_LE]
//! ...
//! ```
//!
//! # Guarantees
//!
//! - **Durability:** every `append()` is followed by an `fsync()` via
//!   [`File::sync_all`], so the index layer may assume value bytes are
//!   stable before it commits the record that points at them.
//! - **Integrity:** `read()` re-verifies the stored checksum; corruption
//!   surfaces as [`VlogError::ChecksumMismatch`], never as silent garbage.
//! - **Atomic rewrite:** `rewrite()` builds the compacted log at a
//!   temporary path and renames it over the old file on success.

#[cfg(test)]
mod tests;

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crc32fast::Hasher as Crc32;
use thiserror::Error;
use tracing::{debug, info};

const VLOG_MAGIC: [u8; 4] = *b"SVL1";
const VLOG_VERSION: u32 = 1;

/// Bytes of the file header: magic + version + CRC32.
const VLOG_HDR_SIZE: u64 = 12;

/// Per-record framing overhead: length prefix + trailing CRC32.
const REC_OVERHEAD: usize = 8;

/// Largest accepted value (16 MiB).
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by value-log operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VlogError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Data integrity failure — a stored checksum did not match.
    #[error("Checksum mismatch")]
    ChecksumMismatch,

    /// Value exceeds [`MAX_VALUE_SIZE`].
    #[error("Value size exceeds limit ({0} bytes)")]
    ValueTooLarge(usize),

    /// Structural damage: bad header, out-of-range offset, or a length
    /// field disagreeing with the index record.
    #[error("Corrupt value log: {0}")]
    Corrupt(String),

    /// Internal consistency or locking error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Vlog
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct VlogInner {
    file: File,
    path: PathBuf,
    /// Offset of the next append, == current file length.
    tail: u64,
}

/// Append-only, CRC-protected value store.
#[derive(Debug)]
pub struct Vlog {
    inner: Mutex<VlogInner>,
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

fn encode_file_header() -> [u8; VLOG_HDR_SIZE as usize] {
    let mut hdr = [0u8; VLOG_HDR_SIZE as usize];
    hdr[..4].copy_from_slice(&VLOG_MAGIC);
    hdr[4..8].copy_from_slice(&VLOG_VERSION.to_le_bytes());
    let crc = crc32(&hdr[..8]);
    hdr[8..12].copy_from_slice(&crc.to_le_bytes());
    hdr
}

fn check_file_header(hdr: &[u8]) -> Result<(), VlogError> {
    if hdr.len() != VLOG_HDR_SIZE as usize {
        return Err(VlogError::Corrupt("truncated header".into()));
    }
    let stored = u32::from_le_bytes(
        hdr[8..12]
            .try_into()
            .map_err(|_| VlogError::Corrupt("short header checksum".into()))?,
    );
    if crc32(&hdr[..8]) != stored {
        return Err(VlogError::ChecksumMismatch);
    }
    if hdr[..4] != VLOG_MAGIC {
        return Err(VlogError::Corrupt("header magic mismatch".into()));
    }
    let version = u32::from_le_bytes(
        hdr[4..8]
            .try_into()
            .map_err(|_| VlogError::Corrupt("short header version".into()))?,
    );
    if version != VLOG_VERSION {
        return Err(VlogError::Corrupt(format!(
            "unsupported header version {version}"
        )));
    }
    Ok(())
}

/// Frame one value record: `[u32 len][bytes][crc32 over bytes]`.
fn encode_record(value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + REC_OVERHEAD);
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value);
    buf.extend_from_slice(&crc32(value).to_le_bytes());
    buf
}

impl Vlog {
    /// Open or create the value log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VlogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let file_len = file.metadata()?.len();

        let tail = if file_len == 0 {
            file.write_all_at(&encode_file_header(), 0)?;
            file.sync_all()?;
            info!(path = %path.display(), "created value log");
            VLOG_HDR_SIZE
        } else {
            let mut hdr = [0u8; VLOG_HDR_SIZE as usize];
            file.read_exact_at(&mut hdr, 0).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    VlogError::Corrupt("truncated header".into())
                } else {
                    VlogError::Io(e)
                }
            })?;
            check_file_header(&hdr)?;
            info!(path = %path.display(), bytes = file_len, "opened value log");
            file_len
        };

        Ok(Self {
            inner: Mutex::new(VlogInner { file, path, tail }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, VlogInner>, VlogError> {
        self.inner
            .lock()
            .map_err(|_| VlogError::Internal("poisoned vlog lock".into()))
    }

    /// Append one value and flush it to stable storage.
    ///
    /// Returns the `(offset, vlen)` pair the index should carry: the
    /// absolute file offset of the record start and the value length.
    pub fn append(&self, value: &[u8]) -> Result<(u64, u32), VlogError> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(VlogError::ValueTooLarge(value.len()));
        }
        let mut inner = self.lock()?;
        let offset = inner.tail;
        let record = encode_record(value);
        inner.file.write_all_at(&record, offset)?;
        inner.tail += record.len() as u64;
        inner.file.sync_all()?;
        Ok((offset, value.len() as u32))
    }

    /// Read back the value record at `offset`, verifying its length against
    /// the index's `vlen` and its stored checksum.
    pub fn read(&self, offset: u64, vlen: u32) -> Result<Vec<u8>, VlogError> {
        let inner = self.lock()?;
        let record_len = vlen as usize + REC_OVERHEAD;
        if offset < VLOG_HDR_SIZE || offset + record_len as u64 > inner.tail {
            return Err(VlogError::Corrupt(format!(
                "record at offset {offset} (+{record_len}) outside log bounds"
            )));
        }

        let mut buf = vec![0u8; record_len];
        inner.file.read_exact_at(&mut buf, offset)?;

        let stored_len = u32::from_le_bytes(
            buf[..4]
                .try_into()
                .map_err(|_| VlogError::Corrupt("short record length".into()))?,
        );
        if stored_len != vlen {
            return Err(VlogError::Corrupt(format!(
                "record length {stored_len} disagrees with index vlen {vlen}"
            )));
        }

        let value = &buf[4..4 + vlen as usize];
        let stored_crc = u32::from_le_bytes(
            buf[4 + vlen as usize..]
                .try_into()
                .map_err(|_| VlogError::Corrupt("short record checksum".into()))?,
        );
        if crc32(value) != stored_crc {
            return Err(VlogError::ChecksumMismatch);
        }

        Ok(value.to_vec())
    }

    /// Replace the log with a compacted one holding exactly `values`, in
    /// order. Returns the new `(offset, vlen)` placement of each value.
    ///
    /// The new log is written to a temporary path, flushed, and renamed
    /// over the old file, so a crash leaves either the old log or the new
    /// one — never a half-written mix.
    pub fn rewrite(&self, values: &[Vec<u8>]) -> Result<Vec<(u64, u32)>, VlogError> {
        let mut inner = self.lock()?;

        let mut tmp_path = inner.path.clone().into_os_string();
        tmp_path.push(".compact");
        let tmp_path = PathBuf::from(tmp_path);

        let tmp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all_at(&encode_file_header(), 0)?;

        let mut placements = Vec::with_capacity(values.len());
        let mut tail = VLOG_HDR_SIZE;
        for value in values {
            if value.len() > MAX_VALUE_SIZE {
                return Err(VlogError::ValueTooLarge(value.len()));
            }
            let record = encode_record(value);
            tmp.write_all_at(&record, tail)?;
            placements.push((tail, value.len() as u32));
            tail += record.len() as u64;
        }
        tmp.sync_all()?;

        fs::rename(&tmp_path, &inner.path)?;
        let reclaimed = inner.tail.saturating_sub(tail);
        inner.file = tmp;
        inner.tail = tail;
        debug!(records = values.len(), reclaimed, "value log rewritten");

        Ok(placements)
    }

    /// Flush any buffered file state.
    pub fn sync(&self) -> Result<(), VlogError> {
        let inner = self.lock()?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Current log length in bytes.
    pub fn len(&self) -> u64 {
        self.inner.lock().map(|g| g.tail).unwrap_or(0)
    }

    /// Whether the log holds no value records.
    pub fn is_empty(&self) -> bool {
        self.len() <= VLOG_HDR_SIZE
    }
}
