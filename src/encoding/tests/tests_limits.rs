#[cfg(test)]
mod tests {
    use crate::encoding::{Decode, EncodingError, decode_from_slice};

    #[test]
    fn truncated_u32_is_eof() {
        let err = decode_from_slice::<u32>(&[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::UnexpectedEof {
                needed: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn truncated_u64_is_eof() {
        assert!(decode_from_slice::<u64>(&[0; 7]).is_err());
    }

    #[test]
    fn truncated_array_is_eof() {
        assert!(decode_from_slice::<[u8; 8]>(&[0; 3]).is_err());
    }

    #[test]
    fn byte_vec_length_beyond_buffer_is_eof() {
        // Length prefix claims 100 bytes but only 2 follow.
        let mut buf = 100u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xAA, 0xBB]);
        assert!(Vec::<u8>::decode_from(&buf).is_err());
    }

    #[test]
    fn byte_vec_length_bomb_is_rejected() {
        // u32::MAX length must fail on the safety limit, not attempt the
        // allocation.
        let buf = u32::MAX.to_le_bytes().to_vec();
        let err = Vec::<u8>::decode_from(&buf).unwrap_err();
        assert!(matches!(err, EncodingError::LengthOverflow(_)));
    }

    #[test]
    fn empty_buffer_fails_for_every_type() {
        assert!(decode_from_slice::<u8>(&[]).is_err());
        assert!(decode_from_slice::<u32>(&[]).is_err());
        assert!(decode_from_slice::<u64>(&[]).is_err());
        assert!(decode_from_slice::<bool>(&[]).is_err());
        assert!(decode_from_slice::<Vec<u8>>(&[]).is_err());
    }
}
