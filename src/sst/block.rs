//! In-memory sparse block index for the sorted levels.
//!
//! For every level above L0 the index records the first key of each
//! `BLOCK_GAP`-item run together with its block ordinal. A lookup binary
//! searches the entries to find the single on-disk block that may contain
//! the key, so a point read touches one block instead of a whole level.
//!
//! The index is derived state: it is rebuilt from disk on open and
//! refreshed after every merge that rewrites a level.

use super::{BLOCK_GAP, Item, MAX_KEY_SIZE, MAX_LEVEL};

/// One sparse-index entry: the first key of a block and its ordinal within
/// the level.
#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    first_key: [u8; MAX_KEY_SIZE],
    block: usize,
}

/// Per-level sparse index. The L0 slot stays empty; L0 is unsorted and is
/// always scanned in full.
#[derive(Debug)]
pub(crate) struct BlockIndex {
    levels: [Vec<BlockEntry>; MAX_LEVEL],
}

impl BlockIndex {
    pub(crate) fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Re-derive the entries for `level` from its full sorted run.
    pub(crate) fn rebuild(&mut self, level: usize, items: &[Item]) {
        let entries = &mut self.levels[level];
        entries.clear();
        for (block, chunk) in items.chunks(BLOCK_GAP).enumerate() {
            entries.push(BlockEntry {
                first_key: chunk[0].key,
                block,
            });
        }
    }

    /// Ordinal of the block whose `[first_key, next_first_key)` range
    /// contains `key`, or `None` when the key cannot be in this level.
    pub(crate) fn search(&self, level: usize, key: &[u8; MAX_KEY_SIZE]) -> Option<usize> {
        let entries = &self.levels[level];
        if entries.is_empty() {
            return None;
        }
        match entries.binary_search_by(|entry| entry.first_key.cmp(key)) {
            Ok(i) => Some(entries[i].block),
            Err(0) => None,
            Err(i) => Some(entries[i - 1].block),
        }
    }

    /// Drop every entry, for `truncate`.
    pub(crate) fn clear(&mut self) {
        for entries in &mut self.levels {
            entries.clear();
        }
    }
}
