//! Shared operation counters.
//!
//! A single [`Stats`] instance is created by the database façade and handed
//! to every component as an `Arc`. Counters are plain relaxed atomics: they
//! are monitoring data, not synchronization, and every mutating path already
//! runs under the owning component's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Process-lifetime operation counters.
#[derive(Debug)]
pub struct Stats {
    start: SystemTime,
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
    level_merges: AtomicU64,
    sst_merge_one: AtomicU64,
    crc_errors: AtomicU64,
}

impl Stats {
    /// Create a zeroed counter set stamped with the current time.
    pub fn new() -> Self {
        Self {
            start: SystemTime::now(),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            removes: AtomicU64::new(0),
            level_merges: AtomicU64::new(0),
            sst_merge_one: AtomicU64::new(0),
            crc_errors: AtomicU64::new(0),
        }
    }

    /// Record one point lookup (including existence checks).
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one put.
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one delete.
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one level-to-level merge inside the SST.
    pub fn record_level_merge(&self) {
        self.level_merges.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one whole-table merge-out (`Sst::in_one`).
    pub fn record_merge_one(&self) {
        self.sst_merge_one.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a value-log checksum failure.
    pub fn record_crc_error(&self) {
        self.crc_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of level merges performed so far.
    pub fn level_merges(&self) -> u64 {
        self.level_merges.load(Ordering::Relaxed)
    }

    /// Number of whole-table merge-outs performed so far.
    pub fn sst_merge_one(&self) -> u64 {
        self.sst_merge_one.load(Ordering::Relaxed)
    }

    /// Take a point-in-time copy of every counter.
    ///
    /// `wasted_bytes` is supplied by the caller because the wasted count
    /// lives in the SST header, not here.
    pub fn snapshot(&self, wasted_bytes: u64) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.start.elapsed().unwrap_or(Duration::ZERO),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            level_merges: self.level_merges.load(Ordering::Relaxed),
            sst_merge_one: self.sst_merge_one.load(Ordering::Relaxed),
            crc_errors: self.crc_errors.load(Ordering::Relaxed),
            wasted_bytes,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-data copy of [`Stats`] at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stats instance was created.
    pub uptime: Duration,
    /// Point lookups served (including existence checks).
    pub reads: u64,
    /// Puts accepted.
    pub writes: u64,
    /// Deletes accepted.
    pub removes: u64,
    /// Level-to-level merges performed by the SST.
    pub level_merges: u64,
    /// Whole-table merge-outs performed by the SST.
    pub sst_merge_one: u64,
    /// Value-log checksum failures observed.
    pub crc_errors: u64,
    /// Value-log bytes made unreachable by overwrites and deletes.
    pub wasted_bytes: u64,
}
