//! Read-only game index for romdex.
//!
//! The index is prepared out-of-band and consumed here without modification:
//!
//! - [`MembershipFilter`] - approximate membership over known file sizes and
//!   known CRC-32 values, used to reject candidates before hashing them
//! - [`ContentStore`] - a read-only snapshot mapping hex MD5 digests to
//!   `code;name` values, also carrying both serialized filters
//! - [`GameIndex`] - the store plus its two decoded filters, opened once per scan
//!
//! # Databank layout
//!
//! The databank is a SQLite file, `romdex.db` in the cache directory by
//! default. It is not the bucketed key-value file other tools may keep in
//! the same directory, and opening one of those fails with
//! [`IndexError::Open`]. Everything lives in one table (see [`SCHEMA`]):
//!
//! | `bucket` | `key`  | `value` |
//! |----------|--------|---------|
//! | `bloom`  | `size` | [`MembershipFilter::to_bytes`] over [`size_key`] (u64 LE) |
//! | `bloom`  | `crc`  | [`MembershipFilter::to_bytes`] over [`crc_key`] (u32 LE) |
//! | `md5`    | lowercase hex MD5 | `code;name` as UTF-8 |
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use romdex_index::{GameIndex, digest_file};
//!
//! let index = GameIndex::open("/media/fat/.cache/WebMenu/romdex.db").unwrap();
//! if index.size_may_match(40_976) {
//!     let (digest, _) = digest_file(Path::new("/media/fat/games/NES/game.nes")).unwrap();
//!     if let Some(entry) = index.lookup(&digest).unwrap() {
//!         println!("{} ({})", entry.name, entry.code);
//!     }
//! }
//! index.close().unwrap();
//! ```

mod digest;
mod filter;
mod index;
mod store;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use digest::{ContentDigest, digest_file, digest_reader};
pub use filter::{FilterError, MembershipFilter, crc_key, size_key};
pub use index::GameIndex;
pub use store::{
    BLOOM_BUCKET, CRC_FILTER_KEY, ContentStore, DIGEST_BUCKET, IndexError, SCHEMA,
    SIZE_FILTER_KEY, StoredEntry,
};
