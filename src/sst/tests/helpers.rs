//! Shared helpers for the SST unit tests.

use std::sync::Arc;

use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::fmt::Subscriber;

use crate::sst::level::level_max;
use crate::sst::{Item, Sst};
use crate::stats::Stats;

pub(crate) fn init_tracing() {
    let _ = Subscriber::builder()
        .with_max_level(Level::TRACE)
        .try_init();
}

/// Open a fresh SST inside `dir` with its own stats instance.
pub(crate) fn open_sst(dir: &TempDir) -> (Sst, Arc<Stats>) {
    let stats = Arc::new(Stats::new());
    let sst = Sst::open(dir.path().join("test.sst"), Arc::clone(&stats)).expect("open sst");
    (sst, stats)
}

/// Reopen the SST previously created by [`open_sst`] in the same dir.
pub(crate) fn reopen_sst(dir: &TempDir) -> (Sst, Arc<Stats>) {
    open_sst(dir)
}

pub(crate) fn item(key: &[u8], offset: u64, vlen: u32) -> Item {
    Item::new_put(key, offset, vlen).expect("valid key")
}

pub(crate) fn tomb(key: &[u8]) -> Item {
    Item::new_tombstone(key).expect("valid key")
}

/// Zero-padded key whose lexicographic order matches numeric order.
pub(crate) fn key(i: u32) -> Vec<u8> {
    format!("key-{i:08}").into_bytes()
}

/// Number of appends that makes L0 hit its guard capacity and trigger the
/// cascade.
pub(crate) fn l0_trigger() -> u32 {
    level_max(0, 1)
}

/// Add `n` distinct keys `key(start) .. key(start + n)`, each with
/// `offset = i` and `vlen = 8`.
pub(crate) fn fill_distinct(sst: &Sst, start: u32, n: u32) {
    for i in start..start + n {
        sst.add(item(&key(i), u64::from(i), 8)).expect("add");
    }
}
