#[cfg(test)]
mod tests {
    use crate::vlog::{Vlog, VlogError};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flipped_value_byte_fails_checksum() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.vlog");

        let vlog = Vlog::open(&path).unwrap();
        let (offset, vlen) = vlog.append(b"important data").unwrap();
        drop(vlog);

        let mut bytes = fs::read(&path).unwrap();
        // Flip a byte in the middle of the value payload.
        let target = offset as usize + 4 + 5;
        bytes[target] ^= 0x01;
        fs::write(&path, &bytes).unwrap();

        let vlog = Vlog::open(&path).unwrap();
        assert!(matches!(
            vlog.read(offset, vlen),
            Err(VlogError::ChecksumMismatch)
        ));
    }

    #[test]
    fn vlen_disagreeing_with_record_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let vlog = Vlog::open(tmp.path().join("test.vlog")).unwrap();

        let (offset, vlen) = vlog.append(b"12345678").unwrap();
        assert!(matches!(
            vlog.read(offset, vlen - 1),
            Err(VlogError::Corrupt(_))
        ));
    }

    #[test]
    fn out_of_bounds_read_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let vlog = Vlog::open(tmp.path().join("test.vlog")).unwrap();

        vlog.append(b"abc").unwrap();
        // Into the file header.
        assert!(matches!(vlog.read(0, 3), Err(VlogError::Corrupt(_))));
        // Past the tail.
        assert!(matches!(
            vlog.read(vlog.len() + 100, 3),
            Err(VlogError::Corrupt(_))
        ));
    }

    #[test]
    fn damaged_file_header_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.vlog");

        let vlog = Vlog::open(&path).unwrap();
        vlog.append(b"x").unwrap();
        drop(vlog);

        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, &bytes).unwrap();

        let err = Vlog::open(&path).unwrap_err();
        assert!(matches!(
            err,
            VlogError::ChecksumMismatch | VlogError::Corrupt(_)
        ));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.vlog");
        fs::write(&path, [0u8; 5]).unwrap();

        assert!(matches!(
            Vlog::open(&path),
            Err(VlogError::Corrupt(_))
        ));
    }
}
