//! Level geometry and the two sorting algorithms of the layered index.
//!
//! A level `k` region holds `LEVEL_BASE^k` times the L0 capacity and starts
//! at a fixed file offset, so the whole file layout is a pure function of
//! the compile-time constants. The algorithms here are pure: they take item
//! slices and a wasted-byte accumulator and leave all file I/O to the
//! caller.

use super::{HEADER_SIZE, ITEM_SIZE, Item, L0_SIZE, LEVEL_BASE};
use std::cmp::Ordering;

/// Absolute file offset of the first byte of `level`'s region.
pub(crate) fn level_offset(level: usize) -> u64 {
    let mut off = HEADER_SIZE as u64;
    for i in 0..level {
        off += (L0_SIZE * LEVEL_BASE.pow(i as u32)) as u64;
    }
    off
}

/// Item capacity of `level`, minus a guard `gap`.
///
/// `gap = 1` at L0 answers "is there room for another append"; `gap = 3`
/// at higher levels answers "is there room for a full promotion from the
/// level above".
pub(crate) fn level_max(level: usize, gap: u32) -> u32 {
    (L0_SIZE * LEVEL_BASE.pow(level as u32) / ITEM_SIZE) as u32 - gap
}

/// Sort a raw L0 run and collapse duplicate keys, newest wins.
///
/// L0 is an append buffer, so a higher input index means a newer write.
/// When a newer item displaces an older live one and the newer item is a
/// tombstone, the displaced value's bytes become unreachable in the value
/// log and are added to `wasted`.
pub(crate) fn sort_l0(items: &[Item], wasted: &mut u64) -> Vec<Item> {
    let mut sorted: Vec<Item> = Vec::with_capacity(items.len());
    for item in items {
        match sorted.binary_search_by(|probe| probe.key.cmp(&item.key)) {
            Ok(pos) => {
                let displaced = sorted[pos];
                if displaced.is_live() && !item.is_live() {
                    *wasted += u64::from(displaced.vlen);
                }
                sorted[pos] = *item;
            }
            Err(pos) => sorted.insert(pos, *item),
        }
    }
    sorted
}

/// Two-cursor merge of a younger sorted run into an older one.
///
/// On equal keys the younger item wins; a live older item displaced by a
/// younger tombstone adds its value length to `wasted`. Consecutive
/// duplicate keys on the older cursor are skipped, so a damaged run cannot
/// re-introduce a stale record.
pub(crate) fn merge_levels(young: &[Item], old: &[Item], wasted: &mut u64) -> Vec<Item> {
    let mut merged: Vec<Item> = Vec::with_capacity(young.len() + old.len());
    let mut m = 0;
    let mut n = 0;

    while m < young.len() && n < old.len() {
        if n > 0 && old[n].key == old[n - 1].key {
            n += 1;
            continue;
        }
        match young[m].key.cmp(&old[n].key) {
            Ordering::Equal => {
                if old[n].is_live() && !young[m].is_live() {
                    *wasted += u64::from(old[n].vlen);
                }
                merged.push(young[m]);
                m += 1;
                n += 1;
            }
            Ordering::Less => {
                merged.push(young[m]);
                m += 1;
            }
            Ordering::Greater => {
                merged.push(old[n]);
                n += 1;
            }
        }
    }

    merged.extend_from_slice(&young[m..]);
    while n < old.len() {
        if n > 0 && old[n].key == old[n - 1].key {
            n += 1;
            continue;
        }
        merged.push(old[n]);
        n += 1;
    }

    merged
}
