//! Membership pre-filter over all live keys, persisted inside the SST header.
//!
//! The filter is seeded with a compile-time constant, so identical key bytes
//! hash to identical bit positions across process restarts. On top of that,
//! the serialized filter — which carries its own hash keys — is stored in a
//! fixed-size region of the SST header and restored verbatim on open, so a
//! bitset written by one build of the store stays valid for the next.
//!
//! Tombstones never clear bits: a false positive for a deleted key is
//! resolved by the level scan, while a negative answer is authoritative and
//! short-circuits the lookup.

use bloomfilter::Bloom;

use super::SstError;

/// On-disk size of the filter region inside the header: a `u32` length
/// prefix, the serialized filter, and zero padding up to this fixed size.
pub(crate) const FILTER_REGION_SIZE: usize = 32 * 1024;

/// Sizing target for the filter. A shard holding more live keys than this
/// degrades to a higher false-positive rate, never to false negatives.
const FILTER_EXPECTED_KEYS: usize = 16 * 1024;

const FILTER_FP_RATE: f64 = 0.01;

/// Compile-time seed; changing it invalidates every persisted bitset.
const FILTER_SEED: &[u8; 32] = b"stratakv-filter-seed-v1-00000000";

/// Bloom filter over live keys.
pub(crate) struct KeyFilter {
    inner: Bloom<Vec<u8>>,
}

impl std::fmt::Debug for KeyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFilter").finish_non_exhaustive()
    }
}

impl KeyFilter {
    /// Fresh empty filter with the compile-time seed.
    pub(crate) fn new() -> Result<Self, SstError> {
        let inner =
            Bloom::new_for_fp_rate_with_seed(FILTER_EXPECTED_KEYS, FILTER_FP_RATE, FILTER_SEED)
                .map_err(|e| SstError::Internal(format!("bloom filter init: {e}")))?;
        Ok(Self { inner })
    }

    pub(crate) fn insert(&mut self, key: &[u8]) {
        self.inner.set(&key.to_vec());
    }

    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        self.inner.check(&key.to_vec())
    }

    /// Drop every recorded key. Used by `truncate`: after the header is
    /// zeroed no key exists any more, so the bitset is reset with it.
    pub(crate) fn clear(&mut self) -> Result<(), SstError> {
        *self = Self::new()?;
        Ok(())
    }

    /// Append the fixed-size header region: `[u32 len][filter bytes][zero
    /// padding]`, exactly [`FILTER_REGION_SIZE`] bytes.
    pub(crate) fn encode_region(&self, buf: &mut Vec<u8>) -> Result<(), SstError> {
        let bytes = self.inner.as_slice();
        if 4 + bytes.len() > FILTER_REGION_SIZE {
            return Err(SstError::Internal(format!(
                "serialized bloom filter ({} bytes) exceeds header region ({FILTER_REGION_SIZE} bytes)",
                bytes.len()
            )));
        }
        let start = buf.len();
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
        buf.resize(start + FILTER_REGION_SIZE, 0);
        Ok(())
    }

    /// Restore a filter from a header region written by [`encode_region`].
    ///
    /// A zero length means the header was created (or truncated) without any
    /// recorded key, and yields a fresh filter.
    ///
    /// [`encode_region`]: KeyFilter::encode_region
    pub(crate) fn decode_region(region: &[u8]) -> Result<Self, SstError> {
        if region.len() != FILTER_REGION_SIZE {
            return Err(SstError::Corrupt(format!(
                "bloom filter region is {} bytes, expected {FILTER_REGION_SIZE}",
                region.len()
            )));
        }
        let len_bytes: [u8; 4] = region[..4]
            .try_into()
            .map_err(|_| SstError::Corrupt("short bloom filter length prefix".into()))?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len == 0 {
            return Self::new();
        }
        if 4 + len > region.len() {
            return Err(SstError::Corrupt(format!(
                "bloom filter length {len} exceeds header region"
            )));
        }
        let inner = Bloom::from_slice(&region[4..4 + len])
            .map_err(|e| SstError::Corrupt(format!("bloom filter decode: {e}")))?;
        Ok(Self { inner })
    }
}
