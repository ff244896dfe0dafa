#[cfg(test)]
mod tests {
    use crate::vlog::Vlog;
    use tempfile::TempDir;

    #[test]
    fn rewrite_compacts_and_remaps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.vlog");
        let vlog = Vlog::open(&path).unwrap();

        for i in 0..50u32 {
            vlog.append(format!("value-{i:04}").into_bytes().as_slice())
                .unwrap();
        }
        let before = vlog.len();

        // Keep only a handful of survivors.
        let survivors: Vec<Vec<u8>> = (0..5u32)
            .map(|i| format!("live-{i}").into_bytes())
            .collect();
        let placements = vlog.rewrite(&survivors).unwrap();

        assert_eq!(placements.len(), survivors.len());
        assert!(vlog.len() < before);
        for ((offset, vlen), value) in placements.iter().zip(&survivors) {
            assert_eq!(&vlog.read(*offset, *vlen).unwrap(), value);
        }
    }

    #[test]
    fn rewritten_log_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.vlog");
        let vlog = Vlog::open(&path).unwrap();

        vlog.append(b"garbage-1").unwrap();
        vlog.append(b"garbage-2").unwrap();
        let placements = vlog.rewrite(&[b"keeper".to_vec()]).unwrap();
        drop(vlog);

        let vlog = Vlog::open(&path).unwrap();
        let (offset, vlen) = placements[0];
        assert_eq!(vlog.read(offset, vlen).unwrap(), b"keeper");
        // The temporary file was renamed away.
        assert!(!tmp.path().join("test.vlog.compact").exists());
    }

    #[test]
    fn rewrite_to_empty_log() {
        let tmp = TempDir::new().unwrap();
        let vlog = Vlog::open(tmp.path().join("test.vlog")).unwrap();

        vlog.append(b"doomed").unwrap();
        let placements = vlog.rewrite(&[]).unwrap();
        assert!(placements.is_empty());
        assert!(vlog.is_empty());
    }
}
