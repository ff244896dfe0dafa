#[cfg(test)]
mod tests {
    use crate::sst::level::level_max;
    use crate::sst::tests::helpers::{fill_distinct, init_tracing, item, key, l0_trigger, open_sst};
    use tempfile::TempDir;

    /// Appends needed to jam both L0 and L1: four promoted batches fill
    /// level 1 past its promotion guard, and a fifth batch is left stuck
    /// in L0 with the optimistic `full[1]` hint set.
    fn jam_first_two_levels() -> u32 {
        5 * l0_trigger()
    }

    #[test]
    fn declined_promotion_sets_optimistic_full_hint() {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let (sst, stats) = open_sst(&tmp);

        fill_distinct(&sst, 0, jam_first_two_levels());

        // Four batches merged; the fifth promotion was declined because
        // level 1 cannot absorb another full L0.
        assert_eq!(stats.level_merges(), 4);
        let counts = sst.counts();
        assert_eq!(counts[0], l0_trigger());
        assert_eq!(counts[1], 4 * l0_trigger());
        assert!(counts[0] + counts[1] > level_max(1, 3));

        let full = sst.full_flags();
        assert!(full[0]);
        assert!(full[1], "declined merge must mark the next level full");
        assert!(!full[2]);
    }

    #[test]
    fn one_insert_cascades_two_merges() {
        let tmp = TempDir::new().unwrap();
        let (sst, stats) = open_sst(&tmp);

        let n = jam_first_two_levels();
        fill_distinct(&sst, 0, n);

        // The next insert drains the jam top-down: level 1 merges into
        // level 2, then L0 merges into the now-empty level 1.
        let before = stats.level_merges();
        sst.add(item(&key(n), u64::from(n), 8)).unwrap();
        assert_eq!(stats.level_merges() - before, 2);

        let counts = sst.counts();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1], l0_trigger() + 1);
        assert_eq!(counts[2], 4 * l0_trigger());
        let full = sst.full_flags();
        assert!(!full[0]);
        assert!(!full[1]);
        assert!(!full[2]);
    }

    #[test]
    fn every_key_survives_the_cascade() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        let n = jam_first_two_levels() + 1;
        fill_distinct(&sst, 0, n);

        for i in (0..n).step_by(43) {
            assert_eq!(sst.get(&key(i)).unwrap(), Some((u64::from(i), 8)));
        }
        assert_eq!(sst.get(&key(n)).unwrap(), None);
    }

    #[test]
    fn counts_never_exceed_level_capacity() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        for i in 0..jam_first_two_levels() + 500 {
            // Overwrite-heavy workload keeps dedup active.
            sst.add(item(&key(i % 700), u64::from(i), 8)).unwrap();
            if i % 251 == 0 {
                for (lvl, &count) in sst.counts().iter().enumerate() {
                    assert!(
                        count <= level_max(lvl, 0),
                        "level {lvl} count {count} exceeds capacity"
                    );
                }
            }
        }
    }

    #[test]
    fn deep_fill_does_not_set_willfull() {
        let tmp = TempDir::new().unwrap();
        let (sst, _stats) = open_sst(&tmp);

        fill_distinct(&sst, 0, jam_first_two_levels() + 1);
        // Two busy levels out of six is nowhere near global capacity.
        assert!(!sst.will_full());
    }
}
