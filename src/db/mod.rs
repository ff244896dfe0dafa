//! Database façade.
//!
//! Composes one SST shard with the value log and the shared statistics
//! counters behind a small key/value API:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                     Db                        │
//! │   put / get / exists / delete / scan          │
//! │        │                      │               │
//! │        ▼                      ▼               │
//! │  ┌──────────┐          ┌────────────┐         │
//! │  │   Sst    │ offset,  │    Vlog    │         │
//! │  │ (index)  │─ vlen ──►│  (values)  │         │
//! │  └──────────┘          └────────────┘         │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! On `put` the value bytes are appended (and flushed) to the value log
//! first; only then is the index record inserted, so the SST never exposes
//! a location whose bytes are not durable. Deletes insert a tombstone
//! record and leave the dead value bytes in the log until [`Db::compact`]
//! rewrites it.
//!
//! One `Db` owns its directory exclusively; there is no cross-process
//! coordination.


use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::sst::{self, Item, Sst, SstError};
use crate::stats::{Stats, StatsSnapshot};
use crate::vlog::{Vlog, VlogError};

/// SST shard file name inside the database directory.
pub const SST_FILE: &str = "db.sst";

/// Value log file name inside the database directory.
pub const VLOG_FILE: &str = "db.vlog";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by database operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DbError {
    /// The key is empty, longer than [`sst::MAX_KEY_SIZE`], or contains a
    /// NUL byte.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Error from the SST index layer.
    #[error("SST error: {0}")]
    Sst(#[from] SstError),

    /// Error from the value log.
    #[error("Value log error: {0}")]
    Vlog(#[from] VlogError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn check_key(key: &[u8]) -> Result<(), DbError> {
    match sst::pack_key(key) {
        Ok(_) => Ok(()),
        Err(SstError::InvalidKey(msg)) => Err(DbError::InvalidKey(msg)),
        Err(other) => Err(DbError::Sst(other)),
    }
}

// ------------------------------------------------------------------------------------------------
// Db
// ------------------------------------------------------------------------------------------------

/// An embedded ordered key/value store over one SST shard and one value
/// log.
pub struct Db {
    sst: Sst,
    vlog: Vlog,
    stats: Arc<Stats>,
}

impl Db {
    /// Open or create a database in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DbError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let stats = Arc::new(Stats::new());
        let sst = Sst::open(dir.join(SST_FILE), Arc::clone(&stats))?;
        let vlog = Vlog::open(dir.join(VLOG_FILE))?;
        info!(dir = %dir.display(), "database open");

        Ok(Self { sst, vlog, stats })
    }

    /// Insert or overwrite `key` with `value`.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        check_key(key)?;
        let (offset, vlen) = self.vlog.append(value)?;
        self.sst.add(Item::new_put(key, offset, vlen)?)?;
        self.stats.record_write();
        Ok(())
    }

    /// Look up `key`, returning its value if present and not deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DbError> {
        self.stats.record_read();
        let Some((offset, vlen)) = self.sst.get(key)? else {
            return Ok(None);
        };
        match self.vlog.read(offset, vlen) {
            Ok(value) => Ok(Some(value)),
            Err(VlogError::ChecksumMismatch) => {
                self.stats.record_crc_error();
                Err(VlogError::ChecksumMismatch.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `key` is present and not deleted. Index-only: the value
    /// bytes are never read.
    pub fn exists(&self, key: &[u8]) -> Result<bool, DbError> {
        self.stats.record_read();
        Ok(self.sst.get(key)?.is_some())
    }

    /// Delete `key` by inserting a tombstone.
    pub fn delete(&self, key: &[u8]) -> Result<(), DbError> {
        check_key(key)?;
        self.sst.add(Item::new_tombstone(key)?)?;
        self.stats.record_remove();
        Ok(())
    }

    /// Range scan over `[start, end)` in key order.
    ///
    /// Returns at most `limit` live pairs; `limit == 0` means unlimited.
    pub fn scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DbError> {
        let run = self.sst.in_one()?;
        let mut out = Vec::new();
        for item in run {
            let key = item.key_bytes();
            if key >= end {
                break;
            }
            if key < start || !item.is_live() {
                continue;
            }
            let value = self.vlog.read(item.offset, item.vlen)?;
            out.push((key.to_vec(), value));
            if limit != 0 && out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    /// Merge the whole index into one run, rewrite the value log with only
    /// the live values, and rebuild the shard from scratch.
    ///
    /// Reclaims the `wasted` bytes accumulated by overwrites and deletes
    /// and clears the near-capacity hint. This is a stop-the-world
    /// maintenance operation and is not crash-atomic: a crash between the
    /// log rename and the index rebuild loses the shard (the log itself
    /// stays intact, old or new).
    pub fn compact(&self) -> Result<(), DbError> {
        let run = self.sst.in_one()?;
        let live: Vec<Item> = run.into_iter().filter(|item| item.is_live()).collect();

        let mut values = Vec::with_capacity(live.len());
        for item in &live {
            values.push(self.vlog.read(item.offset, item.vlen)?);
        }

        let placements = self.vlog.rewrite(&values)?;
        self.sst.truncate()?;
        self.sst.sync()?;
        for (item, (offset, vlen)) in live.iter().zip(placements) {
            self.sst.add(Item::new_put(item.key_bytes(), offset, vlen)?)?;
        }

        info!(records = live.len(), "compaction complete");
        Ok(())
    }

    /// Point-in-time copy of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.sst.wasted())
    }

    /// Advisory: the shard is near capacity and a [`Db::compact`] (or a
    /// fresh shard) is due.
    pub fn is_nearly_full(&self) -> bool {
        self.sst.will_full()
    }

    /// Flush both files and release the database.
    pub fn close(self) -> Result<(), DbError> {
        self.vlog.sync()?;
        self.sst.close()?;
        info!("database closed");
        Ok(())
    }
}
