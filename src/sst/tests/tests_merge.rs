#[cfg(test)]
mod tests {
    use crate::sst::level::level_max;
    use crate::sst::tests::helpers::{
        fill_distinct, init_tracing, item, key, l0_trigger, open_sst, tomb,
    };
    use tempfile::TempDir;

    #[test]
    fn l0_fill_promotes_into_level_1() {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let (sst, stats) = open_sst(&tmp);

        let n = l0_trigger();
        fill_distinct(&sst, 0, n - 1);
        assert_eq!(stats.level_merges(), 0);
        assert_eq!(sst.counts()[0], n - 1);

        // The trigger append fills L0 and runs the cascade synchronously.
        sst.add(item(&key(n - 1), u64::from(n - 1), 8)).unwrap();
        assert_eq!(stats.level_merges(), 1);

        let counts = sst.counts();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1], n);
        // Far below the level-1 promotion guard.
        assert!(n < level_max(1, 3));
        assert!(!sst.full_flags()[0]);
        assert!(!sst.full_flags()[1]);
    }

    #[test]
    fn merged_level_is_sorted_and_unique() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        // Insert in a scrambled order: 3 interleaved arithmetic strides.
        let n = l0_trigger();
        for i in 0..n {
            let k = (i * 97) % n;
            sst.add(item(&key(k), u64::from(k), 8)).unwrap();
        }

        let items = sst.level_items(1).unwrap();
        assert!(!items.is_empty());
        for pair in items.windows(2) {
            assert!(pair[0].key < pair[1].key, "level 1 must be strictly sorted");
        }
    }

    #[test]
    fn duplicate_keys_collapse_during_promotion() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        // 255 appends but only 100 distinct keys; the sort collapses them
        // and only the newest offset survives.
        let n = l0_trigger();
        for i in 0..n {
            let k = i % 100;
            sst.add(item(&key(k), u64::from(i), 8)).unwrap();
        }

        let counts = sst.counts();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1], 100);

        // key(0) was appended at i = 0, 100, 200 — offset 200 wins.
        assert_eq!(sst.get(&key(0)).unwrap(), Some((200, 8)));
        // key(54) was last appended at i = 254.
        assert_eq!(sst.get(&key(54)).unwrap(), Some((254, 8)));
    }

    #[test]
    fn tombstone_over_live_accrues_wasted_at_merge() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        sst.add(item(&key(0), 100, 77)).unwrap();
        sst.add(tomb(&key(0))).unwrap();
        // Not yet sorted, so nothing has been accounted.
        assert_eq!(sst.wasted(), 0);

        // Force the promotion; the L0 sort collapses the pair and records
        // the stranded 77 value bytes.
        fill_distinct(&sst, 1, l0_trigger() - 2);
        assert_eq!(sst.wasted(), 77);

        // The tombstone record survives the merge.
        assert_eq!(sst.get(&key(0)).unwrap(), None);
    }

    #[test]
    fn live_overwrite_does_not_accrue_wasted() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        sst.add(item(&key(0), 100, 77)).unwrap();
        sst.add(item(&key(0), 200, 88)).unwrap();
        fill_distinct(&sst, 1, l0_trigger() - 2);

        // Only tombstone displacement is counted.
        assert_eq!(sst.wasted(), 0);
        assert_eq!(sst.get(&key(0)).unwrap(), Some((200, 88)));
    }

    #[test]
    fn merge_preserves_newest_record_per_key() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        // First generation lands in level 1.
        fill_distinct(&sst, 0, l0_trigger());
        // Second generation overwrites a slice of them, then promotes too.
        for i in 0..l0_trigger() {
            sst.add(item(&key(i % 128), u64::from(i) + 10_000, 9)).unwrap();
        }

        // Overwritten keys resolve to a second-generation offset.
        for i in [0u32, 1, 64, 127] {
            let (offset, vlen) = sst.get(&key(i)).unwrap().expect("present");
            assert!(offset >= 10_000, "key {i} resolved to a stale record");
            assert_eq!(vlen, 9);
        }
        // Keys untouched by the second generation keep their original pair.
        for i in [128u32, 200, 254] {
            assert_eq!(sst.get(&key(i)).unwrap(), Some((u64::from(i), 8)));
        }
    }

    #[test]
    fn wasted_is_monotonic_across_merges() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        // Alternate put and delete rounds over the same key set, so each
        // delete round lands tombstones on live records.
        let mut last = 0;
        for round in 0..4u32 {
            for i in 0..l0_trigger() {
                if i % 10 == 0 && round % 2 == 1 {
                    sst.add(tomb(&key(i))).unwrap();
                } else {
                    sst.add(item(&key(i), u64::from(round * 1000 + i), 8)).unwrap();
                }
            }
            let wasted = sst.wasted();
            assert!(wasted >= last);
            last = wasted;
        }
        assert!(last > 0, "tombstones over live records must accrue waste");
    }
}
