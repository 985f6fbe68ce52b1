//! The databank together with its two pre-screening filters.

use std::path::Path;

use crate::digest::ContentDigest;
use crate::filter::{MembershipFilter, crc_key, size_key};
use crate::store::{
    BLOOM_BUCKET, CRC_FILTER_KEY, ContentStore, IndexError, SIZE_FILTER_KEY, StoredEntry,
};

/// Everything a games scan needs from the databank, loaded once per scan.
pub struct GameIndex {
    store: ContentStore,
    size_filter: MembershipFilter,
    crc_filter: MembershipFilter,
}

impl GameIndex {
    /// Open the databank and decode both filters.
    ///
    /// Fails when either filter is absent or malformed; no scan may run
    /// without them.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let store = ContentStore::open_read_only(path)?;
        let crc_filter = load_filter(&store, CRC_FILTER_KEY)?;
        let size_filter = load_filter(&store, SIZE_FILTER_KEY)?;

        tracing::debug!(
            sizes = size_filter.len(),
            crcs = crc_filter.len(),
            size_fp = size_filter.estimated_false_positive_rate(),
            crc_fp = crc_filter.estimated_false_positive_rate(),
            "index filters loaded"
        );

        Ok(Self {
            store,
            size_filter,
            crc_filter,
        })
    }

    /// Whether a file of this exact length may be a known game.
    pub fn size_may_match(&self, size: u64) -> bool {
        self.size_filter.contains(&size_key(size))
    }

    /// Whether a file with this CRC-32 may be a known game.
    pub fn crc_may_match(&self, crc: u32) -> bool {
        self.crc_filter.contains(&crc_key(crc))
    }

    /// Look up the stored entry for an exact digest.
    pub fn lookup(&self, digest: &ContentDigest) -> Result<Option<StoredEntry>, IndexError> {
        self.store.get_entry(&digest.to_hex())
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Release the store snapshot.
    pub fn close(self) -> Result<(), IndexError> {
        self.store.close()
    }
}

fn load_filter(store: &ContentStore, key: &'static str) -> Result<MembershipFilter, IndexError> {
    let bytes = store
        .get(BLOOM_BUCKET, key)?
        .ok_or(IndexError::MissingFilter { key })?;
    MembershipFilter::from_bytes(&bytes).map_err(|source| IndexError::CorruptFilter { key, source })
}
