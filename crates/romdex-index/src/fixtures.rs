//! Writable databank builder for tests.
//!
//! Produces files in exactly the layout [`GameIndex`](crate::GameIndex) reads.

use std::path::Path;

use rusqlite::{Connection, params};

use crate::digest::ContentDigest;
use crate::filter::{MembershipFilter, crc_key, size_key};
use crate::store::{BLOOM_BUCKET, CRC_FILTER_KEY, DIGEST_BUCKET, SCHEMA, SIZE_FILTER_KEY};

/// In-memory description of a databank, written out with [`IndexFixture::write`].
#[derive(Debug, Clone)]
pub struct IndexFixture {
    size_filter: MembershipFilter,
    crc_filter: MembershipFilter,
    entries: Vec<(String, String)>,
    raw_filters: Vec<(&'static str, Vec<u8>)>,
    omitted: Vec<&'static str>,
}

impl IndexFixture {
    pub fn new() -> Self {
        Self {
            size_filter: MembershipFilter::with_rate(1024, 0.0001),
            crc_filter: MembershipFilter::with_rate(1024, 0.0001),
            entries: Vec::new(),
            raw_filters: Vec::new(),
            omitted: Vec::new(),
        }
    }

    /// Register a known game: its size, CRC and digest, stored as `value`.
    ///
    /// Returns the hex digest of `content`.
    pub fn add_game(&mut self, content: &[u8], value: &str) -> String {
        self.add_size(content.len() as u64);
        self.add_crc(crc32fast::hash(content));
        let digest = ContentDigest::of(content).to_hex();
        self.add_entry(&digest, value);
        digest
    }

    pub fn add_size(&mut self, size: u64) -> &mut Self {
        self.size_filter.insert(&size_key(size));
        self
    }

    pub fn add_crc(&mut self, crc: u32) -> &mut Self {
        self.crc_filter.insert(&crc_key(crc));
        self
    }

    pub fn add_entry(&mut self, digest_hex: &str, value: &str) -> &mut Self {
        self.entries.push((digest_hex.to_string(), value.to_string()));
        self
    }

    /// Leave a filter key out of the written databank.
    pub fn without_filter(mut self, key: &'static str) -> Self {
        self.omitted.push(key);
        self
    }

    /// Store arbitrary bytes under a filter key instead of the built filter.
    pub fn with_raw_filter(mut self, key: &'static str, bytes: Vec<u8>) -> Self {
        self.raw_filters.push((key, bytes));
        self
    }

    /// Create (or replace) a databank file at `path`.
    pub fn write(&self, path: &Path) -> rusqlite::Result<()> {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
        let mut conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        {
            let mut insert =
                tx.prepare("INSERT OR REPLACE INTO entries (bucket, key, value) VALUES (?1, ?2, ?3)")?;

            for (key, filter) in [
                (SIZE_FILTER_KEY, &self.size_filter),
                (CRC_FILTER_KEY, &self.crc_filter),
            ] {
                if self.omitted.contains(&key) {
                    continue;
                }
                let bytes = self
                    .raw_filters
                    .iter()
                    .find(|(raw_key, _)| *raw_key == key)
                    .map(|(_, bytes)| bytes.clone())
                    .unwrap_or_else(|| filter.to_bytes());
                insert.execute(params![BLOOM_BUCKET, key, bytes])?;
            }

            for (digest, value) in &self.entries {
                insert.execute(params![DIGEST_BUCKET, digest, value.as_bytes()])?;
            }
        }
        tx.commit()
    }
}

impl Default for IndexFixture {
    fn default() -> Self {
        Self::new()
    }
}
