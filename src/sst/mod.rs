//! Sorted String Table (SST) Module
//!
//! This module implements the core of the store: a **write-optimized**,
//! **cache-oblivious** layered index over fixed-size records, one file per
//! database shard. Levels are sorted arrays of geometrically growing
//! capacity; inserts land in the unsorted L0 append buffer and migrate
//! downward through an amortized merge cascade.
//!
//! ## Design Overview
//!
//! An SST file holds `MAX_LEVEL` regions. L0 is an insertion buffer: items
//! are appended in arrival order and sorted in memory (newest wins) before
//! any merge or read-out. Every level above L0 is stored fully sorted and
//! deduplicated. When L0 fills, the cascade promotes full levels into the
//! level below them with a two-cursor merge; a single insert can drive at
//! most `MAX_LEVEL - 1` merges.
//!
//! Values live in an external append-only value log; the SST stores only
//! `(key, offset, vlen, opt)` index records. Deletes are tombstones — the
//! record stays, its live bit drops, and the dead value bytes are tracked
//! in the header's `wasted` counter for later reclamation.
//!
//! # On-disk layout
//!
//! ```text
//! [ 0 .. HEADER_SIZE )          header (committed last on every mutation)
//! [ HEADER_SIZE .. +L0 )        level 0 region   (L0_SIZE bytes)
//! [ .. +L0*B )                  level 1 region   (L0_SIZE * LEVEL_BASE bytes)
//! ...
//! [ .. +L0*B^k )                level k region
//! ```
//!
//! Header, little-endian throughout:
//!
//! ```text
//! [MAGIC][VERSION]
//! [count[MAX_LEVEL] u32s][full[MAX_LEVEL] u8s]
//! [wasted u64][max_key MAX_KEY_SIZE bytes, NUL-padded]
//! [bloom region: u32 len + filter bytes + zero padding]
//! [CRC32 over everything above]
//! ```
//!
//! # Commit discipline
//!
//! The header is the single source of truth for level occupancy. Region
//! bytes are written first, flushed, and only then does the header write
//! expose them — once the header lands, the mutation is committed. The L0
//! append path orders its two writes but does not flush: a torn final
//! append is invisible because `count[0]` has not advanced.
//!
//! # Concurrency model
//!
//! Single writer, multiple readers within one process, coordinated by one
//! mutex per SST instance. Lookups take the mutex too: merges reshape the
//! regions under any in-flight positional read.
//!
//! # Guarantees
//!
//! - **Newer wins:** for a key present in several levels, the record in the
//!   lowest level is definitive; within L0 the latest append is.
//! - **Sorted levels:** every level above L0 is strictly key-sorted with
//!   unique keys.
//! - **Atomic adds:** an `add` either wholly commits (header updated) or is
//!   invisible on the next open.
//! - **Authoritative negatives:** a bloom-filter miss short-circuits the
//!   lookup; false positives are resolved by the level scan.

pub(crate) mod block;
pub(crate) mod bloom;
pub(crate) mod level;

#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crc32fast::Hasher as Crc32;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::encoding::{self, Decode, Encode, EncodingError};
use crate::stats::Stats;
use block::BlockIndex;
use bloom::KeyFilter;
use level::{level_max, level_offset, merge_levels, sort_l0};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Number of level regions in an SST file.
pub const MAX_LEVEL: usize = 6;

/// Fan-out: each level holds `LEVEL_BASE` times the capacity of the one
/// above it.
pub const LEVEL_BASE: usize = 4;

/// Longest accepted key, in bytes. Keys are NUL-free and stored zero-padded.
pub const MAX_KEY_SIZE: usize = 35;

/// Bytes per index record: key + offset (u64) + vlen (u32) + opt (u8).
pub const ITEM_SIZE: usize = MAX_KEY_SIZE + 8 + 4 + 1;

/// Byte capacity of the L0 region (256 items).
pub const L0_SIZE: usize = 256 * ITEM_SIZE;

/// Items per sparse-index block in the sorted levels.
pub const BLOCK_GAP: usize = 64;

const BLOCK_SIZE: usize = BLOCK_GAP * ITEM_SIZE;

const SST_MAGIC: [u8; 4] = *b"SST1";
const SST_VERSION: u32 = 1;

/// Fixed size of the on-disk header.
pub(crate) const HEADER_SIZE: usize =
    4 + 4 + 4 * MAX_LEVEL + MAX_LEVEL + 8 + MAX_KEY_SIZE + bloom::FILTER_REGION_SIZE + 4;

/// Bit 0 of the `opt` byte: 1 = live put, 0 = tombstone.
pub const OPT_LIVE: u8 = 1;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by SST operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SstError {
    /// Underlying I/O error. Fatal; the operation is aborted and no repair
    /// is attempted.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The file failed an integrity check on open: magic/version/checksum
    /// mismatch, or level counts exceeding region capacity.
    #[error("Corrupt SST: {0}")]
    Corrupt(String),

    /// The caller supplied a key the record format cannot hold.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Internal invariant violation or poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Item — one fixed-size index record
// ------------------------------------------------------------------------------------------------

/// One fixed-size index record: a zero-padded key, the value's location in
/// the external value log, and the live/tombstone bit.
///
/// Keys are NUL-free, so comparing the padded arrays lexicographically is
/// exactly NUL-terminated string comparison, and array equality is full-key
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Zero-padded key bytes.
    pub key: [u8; MAX_KEY_SIZE],

    /// Byte offset of the value record in the value log.
    pub offset: u64,

    /// Value length in bytes (0 for tombstones).
    pub vlen: u32,

    /// Option byte; bit 0 is the live flag.
    pub opt: u8,
}

impl Item {
    /// Build a live record pointing at `(offset, vlen)` in the value log.
    pub fn new_put(key: &[u8], offset: u64, vlen: u32) -> Result<Self, SstError> {
        Ok(Self {
            key: pack_key(key)?,
            offset,
            vlen,
            opt: OPT_LIVE,
        })
    }

    /// Build a tombstone record for `key`.
    pub fn new_tombstone(key: &[u8]) -> Result<Self, SstError> {
        Ok(Self {
            key: pack_key(key)?,
            offset: 0,
            vlen: 0,
            opt: 0,
        })
    }

    /// Whether this record is a live put (as opposed to a tombstone).
    pub fn is_live(&self) -> bool {
        self.opt & OPT_LIVE != 0
    }

    /// The key with its zero padding stripped.
    pub fn key_bytes(&self) -> &[u8] {
        let end = self
            .key
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_KEY_SIZE);
        &self.key[..end]
    }

    /// `(offset, vlen)` when live, `None` for a tombstone.
    fn location(&self) -> Option<(u64, u32)> {
        self.is_live().then(|| (self.offset, self.vlen))
    }
}

/// Zero-pad `key` into the fixed record form, rejecting keys the format
/// cannot hold (empty, over-long, or containing NUL bytes).
pub fn pack_key(key: &[u8]) -> Result<[u8; MAX_KEY_SIZE], SstError> {
    if key.is_empty() {
        return Err(SstError::InvalidKey("empty key".into()));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(SstError::InvalidKey(format!(
            "key length {} exceeds maximum {MAX_KEY_SIZE}",
            key.len()
        )));
    }
    if key.contains(&0) {
        return Err(SstError::InvalidKey("key contains a NUL byte".into()));
    }
    let mut packed = [0u8; MAX_KEY_SIZE];
    packed[..key.len()].copy_from_slice(key);
    Ok(packed)
}

impl Encode for Item {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.key.encode_to(buf)?;
        self.offset.encode_to(buf)?;
        self.vlen.encode_to(buf)?;
        self.opt.encode_to(buf)?;
        Ok(())
    }
}

impl Decode for Item {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut off = 0;
        let (key, n) = <[u8; MAX_KEY_SIZE]>::decode_from(&buf[off..])?;
        off += n;
        let (offset, n) = u64::decode_from(&buf[off..])?;
        off += n;
        let (vlen, n) = u32::decode_from(&buf[off..])?;
        off += n;
        let (opt, n) = u8::decode_from(&buf[off..])?;
        off += n;
        Ok((
            Self {
                key,
                offset,
                vlen,
                opt,
            },
            off,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// Header
// ------------------------------------------------------------------------------------------------

/// In-memory copy of the on-disk header, minus the bloom region (which
/// lives in [`KeyFilter`]) and the magic/version/CRC framing.
#[derive(Debug, Clone)]
struct Header {
    /// Live items currently occupying each level.
    count: [u32; MAX_LEVEL],

    /// Near-capacity hints, consumed only by the merge cascade.
    full: [bool; MAX_LEVEL],

    /// Cumulative value-log bytes made unreachable by overwrite or delete.
    wasted: u64,

    /// Largest key ever inserted; monotonically non-decreasing.
    max_key: [u8; MAX_KEY_SIZE],
}

impl Default for Header {
    fn default() -> Self {
        Self {
            count: [0; MAX_LEVEL],
            full: [false; MAX_LEVEL],
            wasted: 0,
            max_key: [0; MAX_KEY_SIZE],
        }
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Serialize the full on-disk header, exactly [`HEADER_SIZE`] bytes.
fn encode_header(header: &Header, filter: &KeyFilter) -> Result<Vec<u8>, SstError> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    SST_MAGIC.encode_to(&mut buf)?;
    SST_VERSION.encode_to(&mut buf)?;
    for count in &header.count {
        count.encode_to(&mut buf)?;
    }
    for full in &header.full {
        full.encode_to(&mut buf)?;
    }
    header.wasted.encode_to(&mut buf)?;
    header.max_key.encode_to(&mut buf)?;
    filter.encode_region(&mut buf)?;
    let crc = crc32(&buf);
    crc.encode_to(&mut buf)?;
    debug_assert_eq!(buf.len(), HEADER_SIZE);
    Ok(buf)
}

/// Decode and verify a header read from disk.
fn decode_header(buf: &[u8]) -> Result<(Header, KeyFilter), SstError> {
    if buf.len() != HEADER_SIZE {
        return Err(SstError::Corrupt(format!(
            "header is {} bytes, expected {HEADER_SIZE}",
            buf.len()
        )));
    }

    let crc_at = HEADER_SIZE - 4;
    let (stored_crc, _) = u32::decode_from(&buf[crc_at..])?;
    if crc32(&buf[..crc_at]) != stored_crc {
        return Err(SstError::Corrupt("header checksum mismatch".into()));
    }

    let mut off = 0;
    let (magic, n) = <[u8; 4]>::decode_from(&buf[off..])?;
    off += n;
    if magic != SST_MAGIC {
        return Err(SstError::Corrupt("header magic mismatch".into()));
    }
    let (version, n) = u32::decode_from(&buf[off..])?;
    off += n;
    if version != SST_VERSION {
        return Err(SstError::Corrupt(format!(
            "unsupported header version {version}"
        )));
    }

    let mut count = [0u32; MAX_LEVEL];
    for slot in &mut count {
        let (c, n) = u32::decode_from(&buf[off..])?;
        off += n;
        *slot = c;
    }
    let mut full = [false; MAX_LEVEL];
    for slot in &mut full {
        let (f, n) = bool::decode_from(&buf[off..])?;
        off += n;
        *slot = f;
    }
    let (wasted, n) = u64::decode_from(&buf[off..])?;
    off += n;
    let (max_key, n) = <[u8; MAX_KEY_SIZE]>::decode_from(&buf[off..])?;
    off += n;

    for (lvl, &c) in count.iter().enumerate() {
        if c > level_max(lvl, 0) {
            return Err(SstError::Corrupt(format!(
                "level {lvl} count {c} exceeds capacity {}",
                level_max(lvl, 0)
            )));
        }
    }

    let filter = KeyFilter::decode_region(&buf[off..off + bloom::FILTER_REGION_SIZE])?;

    Ok((
        Header {
            count,
            full,
            wasted,
            max_key,
        },
        filter,
    ))
}

// ------------------------------------------------------------------------------------------------
// Positional level I/O
// ------------------------------------------------------------------------------------------------

/// Read the live prefix of a level into memory. L0 comes back in append
/// (arrival) order; higher levels come back sorted.
fn read_level(file: &File, level: usize, count: u32) -> Result<Vec<Item>, SstError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut buf = vec![0u8; count as usize * ITEM_SIZE];
    file.read_exact_at(&mut buf, level_offset(level))?;
    let mut items = Vec::with_capacity(count as usize);
    let mut off = 0;
    for _ in 0..count {
        let (item, n) = Item::decode_from(&buf[off..])?;
        off += n;
        items.push(item);
    }
    Ok(items)
}

/// Write a full sorted run to a level region and refresh its block index.
fn write_level(
    file: &File,
    blocks: &mut BlockIndex,
    level: usize,
    items: &[Item],
) -> Result<(), SstError> {
    let mut buf = Vec::with_capacity(items.len() * ITEM_SIZE);
    for item in items {
        item.encode_to(&mut buf)?;
    }
    file.write_all_at(&buf, level_offset(level))?;
    blocks.rebuild(level, items);
    Ok(())
}

/// Rewrite the header in place at offset 0.
fn write_header(file: &File, header: &Header, filter: &KeyFilter) -> Result<(), SstError> {
    let bytes = encode_header(header, filter)?;
    file.write_all_at(&bytes, 0)?;
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Sst
// ------------------------------------------------------------------------------------------------

/// All mutable state, owned by the instance mutex.
#[derive(Debug)]
struct SstInner {
    file: File,
    header: Header,
    filter: KeyFilter,
    blocks: BlockIndex,
    /// Reusable one-block read buffer for the lookup path.
    oneblk: Vec<u8>,
    /// Advisory near-capacity flag for the enclosing layer.
    willfull: bool,
}

/// One SST shard: a single file holding the layered sorted index.
#[derive(Debug)]
pub struct Sst {
    inner: Mutex<SstInner>,
    stats: Arc<Stats>,
}

impl Sst {
    /// Open or create the SST at `path`.
    ///
    /// A fresh file gets a zeroed header committed immediately. An existing
    /// file has its header verified (magic, version, checksum, count
    /// bounds) and its block indexes rebuilt by scanning each sorted level.
    pub fn open(path: impl AsRef<Path>, stats: Arc<Stats>) -> Result<Self, SstError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();

        let (header, filter, blocks) = if file_len == 0 {
            let header = Header::default();
            let filter = KeyFilter::new()?;
            write_header(&file, &header, &filter)?;
            file.sync_data()?;
            info!(path = %path.display(), "created empty sst");
            (header, filter, BlockIndex::new())
        } else {
            let mut bytes = vec![0u8; HEADER_SIZE];
            file.read_exact_at(&mut bytes, 0).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    SstError::Corrupt("truncated header".into())
                } else {
                    SstError::Io(e)
                }
            })?;
            let (header, filter) = decode_header(&bytes)?;

            let mut blocks = BlockIndex::new();
            for lvl in 1..MAX_LEVEL {
                let count = header.count[lvl];
                if count > 0 {
                    let items = read_level(&file, lvl, count)?;
                    blocks.rebuild(lvl, &items);
                }
            }
            let total: u32 = header.count.iter().sum();
            info!(path = %path.display(), items = total, "opened sst");
            (header, filter, blocks)
        };

        Ok(Self {
            inner: Mutex::new(SstInner {
                file,
                header,
                filter,
                blocks,
                oneblk: vec![0u8; BLOCK_SIZE],
                willfull: false,
            }),
            stats,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, SstInner>, SstError> {
        self.inner
            .lock()
            .map_err(|_| SstError::Internal("poisoned sst lock".into()))
    }

    /// Append one record to L0 and commit the header; when L0 reaches its
    /// guard capacity, run the merge cascade.
    pub fn add(&self, item: Item) -> Result<(), SstError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        // count[0] can only reach full region capacity after every deeper
        // level jammed (willfull has long been set); appending past it
        // would spill into the level-1 region.
        if inner.header.count[0] >= level_max(0, 0) {
            return Err(SstError::Internal("level 0 region exhausted".into()));
        }

        if item.is_live() {
            inner.filter.insert(item.key_bytes());
        }
        if item.key > inner.header.max_key {
            inner.header.max_key = item.key;
        }

        let pos = level_offset(0) + u64::from(inner.header.count[0]) * ITEM_SIZE as u64;
        let bytes = encoding::encode_to_vec(&item)?;
        inner.file.write_all_at(&bytes, pos)?;
        inner.header.count[0] += 1;
        write_header(&inner.file, &inner.header, &inner.filter)?;
        trace!(key = ?item.key_bytes(), live = item.is_live(), "sst add");

        if inner.header.count[0] >= level_max(0, 1) {
            inner.header.full[0] = true;
            self.check_merge(inner)?;
        }
        Ok(())
    }

    /// Point lookup. Returns the value-log location for a live record,
    /// `None` for a tombstone or an unknown key.
    pub fn get(&self, key: &[u8]) -> Result<Option<(u64, u32)>, SstError> {
        let Ok(packed) = pack_key(key) else {
            // A key the record format cannot hold was never inserted.
            return Ok(None);
        };

        let mut guard = self.lock()?;
        let inner = &mut *guard;

        if !inner.filter.contains(key) {
            return Ok(None);
        }

        // L0 in reverse append order, so the latest write for a key wins.
        let l0 = read_level(&inner.file, 0, inner.header.count[0])?;
        for item in l0.iter().rev() {
            if item.key == packed {
                return Ok(item.location());
            }
        }

        for lvl in 1..MAX_LEVEL {
            let count = inner.header.count[lvl] as usize;
            if count == 0 {
                continue;
            }
            let Some(block) = inner.blocks.search(lvl, &packed) else {
                continue;
            };
            let first = block * BLOCK_GAP;
            let in_block = BLOCK_GAP.min(count - first);
            let buf = &mut inner.oneblk[..in_block * ITEM_SIZE];
            inner
                .file
                .read_exact_at(buf, level_offset(lvl) + (first * ITEM_SIZE) as u64)?;
            let mut off = 0;
            for _ in 0..in_block {
                let (item, n) = Item::decode_from(&buf[off..])?;
                off += n;
                if item.key == packed {
                    return Ok(item.location());
                }
            }
        }

        Ok(None)
    }

    /// Zero the header, bloom bitset, and block indexes **in memory**.
    ///
    /// The caller decides when (and whether) to persist the empty state
    /// with [`Sst::sync`]; until then the on-disk file is untouched.
    pub fn truncate(&self) -> Result<(), SstError> {
        let mut inner = self.lock()?;
        inner.header = Header::default();
        inner.filter.clear()?;
        inner.blocks.clear();
        inner.willfull = false;
        debug!("sst truncated in memory");
        Ok(())
    }

    /// Persist the current header and flush it to stable storage.
    pub fn sync(&self) -> Result<(), SstError> {
        let inner = self.lock()?;
        write_header(&inner.file, &inner.header, &inner.filter)?;
        inner.file.sync_data()?;
        Ok(())
    }

    /// Merge every level into a single sorted, deduplicated run.
    ///
    /// The returned buffer is owned by the caller and includes tombstone
    /// records — shard-level compaction needs to see deletions. The
    /// duplicate bookkeeping done while merging is discarded: `in_one` is a
    /// read-only view and never touches the persisted header.
    pub fn in_one(&self) -> Result<Vec<Item>, SstError> {
        let inner = self.lock()?;
        let mut scratch = 0u64;

        let raw = read_level(&inner.file, 0, inner.header.count[0])?;
        let mut run = sort_l0(&raw, &mut scratch);
        for lvl in 1..MAX_LEVEL {
            let count = inner.header.count[lvl];
            if count == 0 {
                continue;
            }
            let old = read_level(&inner.file, lvl, count)?;
            run = merge_levels(&run, &old, &mut scratch);
        }

        self.stats.record_merge_one();
        Ok(run)
    }

    /// Advisory: the shard is near global capacity and the enclosing layer
    /// should direct new writes elsewhere. Never authoritative — the SST
    /// keeps accepting inserts.
    pub fn will_full(&self) -> bool {
        self.inner.lock().map(|g| g.willfull).unwrap_or(false)
    }

    /// Cumulative value-log bytes made unreachable by overwrite or delete.
    pub fn wasted(&self) -> u64 {
        self.inner.lock().map(|g| g.header.wasted).unwrap_or(0)
    }

    /// Current per-level item counts.
    pub fn counts(&self) -> [u32; MAX_LEVEL] {
        self.inner
            .lock()
            .map(|g| g.header.count)
            .unwrap_or([0; MAX_LEVEL])
    }

    /// Current per-level full hints.
    pub fn full_flags(&self) -> [bool; MAX_LEVEL] {
        self.inner
            .lock()
            .map(|g| g.header.full)
            .unwrap_or([false; MAX_LEVEL])
    }

    /// Largest key ever inserted, with padding stripped.
    pub fn max_key(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|g| {
                let end = g
                    .header
                    .max_key
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(MAX_KEY_SIZE);
                g.header.max_key[..end].to_vec()
            })
            .unwrap_or_default()
    }

    /// Flush file contents and release the shard.
    pub fn close(self) -> Result<(), SstError> {
        let inner = self.lock()?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Raw (unsorted for L0) on-disk contents of a level's live prefix.
    #[cfg(test)]
    pub(crate) fn level_items(&self, level: usize) -> Result<Vec<Item>, SstError> {
        let inner = self.lock()?;
        read_level(&inner.file, level, inner.header.count[level])
    }

    // --------------------------------------------------------------------------------------------
    // Merge cascade
    // --------------------------------------------------------------------------------------------

    /// One cascade pass, strictly top-down: for each full level whose
    /// successor is not full, either merge into the successor or mark the
    /// successor full as an optimistic hint when the promotion would not
    /// fit. Top-down order lets a single insert drain a whole chain of
    /// jammed levels in one pass.
    fn check_merge(&self, inner: &mut SstInner) -> Result<(), SstError> {
        for lvl in (0..=MAX_LEVEL - 2).rev() {
            if !inner.header.full[lvl] {
                continue;
            }
            if inner.header.full[lvl + 1] {
                continue;
            }
            let count = inner.header.count[lvl];
            let next_count = inner.header.count[lvl + 1];
            let next_max = level_max(lvl + 1, 3);
            if count + next_count <= next_max {
                self.merge_to_next(inner, lvl)?;
            } else {
                // Hint only; re-examined once level lvl+1 itself drains.
                inner.header.full[lvl + 1] = true;
                trace!(level = lvl + 1, "promotion deferred, level marked full");
            }
        }

        let full_levels = inner.header.full.iter().filter(|f| **f).count();
        if full_levels >= MAX_LEVEL - 1 && !inner.willfull {
            inner.willfull = true;
            warn!("sst near global capacity; enclosing layer should rotate shards");
        }
        Ok(())
    }

    /// Promote `level` into `level + 1`: sorted two-cursor merge, region
    /// write, flush barrier, then header commit.
    fn merge_to_next(&self, inner: &mut SstInner, lvl: usize) -> Result<(), SstError> {
        let next = lvl + 1;
        let c1 = inner.header.count[lvl];
        let c2 = inner.header.count[next];

        let raw = read_level(&inner.file, lvl, c1)?;
        let young = if lvl == 0 {
            sort_l0(&raw, &mut inner.header.wasted)
        } else {
            raw
        };
        let old = read_level(&inner.file, next, c2)?;
        let merged = merge_levels(&young, &old, &mut inner.header.wasted);

        if merged.len() > level_max(next, 0) as usize {
            return Err(SstError::Corrupt(format!(
                "merge into level {next} produced {} items, capacity {}",
                merged.len(),
                level_max(next, 0)
            )));
        }

        write_level(&inner.file, &mut inner.blocks, next, &merged)?;
        // Region bytes must be durable before the header exposes them.
        inner.file.sync_data()?;

        inner.header.count[lvl] = 0;
        inner.header.count[next] = merged.len() as u32;
        inner.header.full[lvl] = false;
        inner.header.full[next] = merged.len() as u32 >= level_max(next, 3);
        if lvl > 0 {
            inner.blocks.rebuild(lvl, &[]);
        }
        write_header(&inner.file, &inner.header, &inner.filter)?;
        inner.file.sync_data()?;

        self.stats.record_level_merge();
        debug!(
            from = lvl,
            to = next,
            merged = merged.len(),
            wasted = inner.header.wasted,
            "level merge"
        );
        Ok(())
    }
}
