//! Approximate membership filter used to reject candidates before hashing.
//!
//! A classic bloom filter over a flat `u64` word array. Bit positions come from
//! double hashing one 128-bit XXH3 digest of the key, so a membership test
//! costs a single hash and `k` word reads with no allocation.
//!
//! The filter never reports a false negative. False positives only cost an
//! unnecessary exact digest further down the pipeline.

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

const MAGIC: &[u8; 4] = b"RXBF";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 24;
const MAX_HASHES: u8 = 32;

/// Errors decoding a serialized filter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter is {0} bytes, shorter than its header")]
    Truncated(usize),

    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid hash count {0}")]
    InvalidHashCount(u8),

    #[error("filter has zero bits")]
    Empty,

    #[error("expected {expected} bytes of bit data, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Key under which a file length is inserted: its 8-byte little-endian encoding.
pub fn size_key(size: u64) -> [u8; 8] {
    size.to_le_bytes()
}

/// Key under which a CRC-32 is inserted: its 4-byte little-endian encoding.
pub fn crc_key(crc: u32) -> [u8; 4] {
    crc.to_le_bytes()
}

/// Bloom filter over arbitrary byte keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipFilter {
    words: Vec<u64>,
    bit_count: u64,
    hash_count: u8,
    inserted: u64,
}

impl MembershipFilter {
    /// Create an empty filter sized for `expected_items` at the given false positive rate.
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let bits = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let hashes = ((bits as f64 / n) * ln2).round().clamp(1.0, MAX_HASHES as f64) as u8;

        Self::with_bits(bits, hashes)
    }

    /// Create an empty filter with an explicit geometry.
    pub fn with_bits(bit_count: u64, hash_count: u8) -> Self {
        let bit_count = bit_count.max(1);
        let word_count = bit_count.div_ceil(64) as usize;
        Self {
            words: vec![0; word_count],
            bit_count,
            hash_count: hash_count.clamp(1, MAX_HASHES),
            inserted: 0,
        }
    }

    /// Add a key.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = split_hash(key);
        for i in 0..u64::from(self.hash_count) {
            let bit = self.bit_index(h1, h2, i);
            self.words[(bit / 64) as usize] |= 1 << (bit % 64);
        }
        self.inserted += 1;
    }

    /// Test a key. `false` means the key was definitely never inserted.
    pub fn contains(&self, key: &[u8]) -> bool {
        let (h1, h2) = split_hash(key);
        (0..u64::from(self.hash_count)).all(|i| {
            let bit = self.bit_index(h1, h2, i);
            self.words[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    /// Number of keys inserted when the filter was built.
    pub fn len(&self) -> u64 {
        self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    pub fn hash_count(&self) -> u8 {
        self.hash_count
    }

    /// Expected false positive rate given the number of inserted keys.
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = f64::from(self.hash_count);
        let fill = 1.0 - (-k * self.inserted as f64 / self.bit_count as f64).exp();
        fill.powf(k)
    }

    /// Serialize into the persisted layout.
    ///
    /// Layout (little-endian): magic `RXBF`, version, hash count, two reserved
    /// bytes, bit count (u64), inserted key count (u64), then the bit words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.words.len() * 8);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.hash_count);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&self.bit_count.to_le_bytes());
        out.extend_from_slice(&self.inserted.to_le_bytes());
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Decode a filter written by [`MembershipFilter::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        if bytes.len() < HEADER_LEN {
            return Err(FilterError::Truncated(bytes.len()));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if &header[0..4] != MAGIC {
            return Err(FilterError::BadMagic);
        }
        if header[4] != FORMAT_VERSION {
            return Err(FilterError::UnsupportedVersion(header[4]));
        }
        let hash_count = header[5];
        if hash_count == 0 || hash_count > MAX_HASHES {
            return Err(FilterError::InvalidHashCount(hash_count));
        }
        let bit_count = read_u64(&header[8..16]);
        if bit_count == 0 {
            return Err(FilterError::Empty);
        }
        let inserted = read_u64(&header[16..24]);

        let expected = usize::try_from(bit_count.div_ceil(64))
            .ok()
            .and_then(|words| words.checked_mul(8))
            .unwrap_or(usize::MAX);
        if body.len() != expected {
            return Err(FilterError::LengthMismatch {
                expected,
                found: body.len(),
            });
        }

        let words = body.chunks_exact(8).map(read_u64).collect();
        Ok(Self {
            words,
            bit_count,
            hash_count,
            inserted,
        })
    }

    #[inline]
    fn bit_index(&self, h1: u64, h2: u64, i: u64) -> u64 {
        h1.wrapping_add(i.wrapping_mul(h2)) % self.bit_count
    }
}

#[inline]
fn split_hash(key: &[u8]) -> (u64, u64) {
    let hash = xxh3_128(key);
    // An odd step visits distinct positions for every i when bit_count is a power of two.
    (hash as u64, ((hash >> 64) as u64) | 1)
}

#[inline]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
