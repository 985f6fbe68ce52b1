//! Read-only snapshot of the persisted game databank.
//!
//! The databank is a bucketed key-value table in SQLite. Two buckets matter:
//! `bloom` holds the serialized size and CRC filters, `md5` maps a lowercase
//! hex digest to a `code;name` value. The engine never writes to it.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

use romdex_core::ScanError;

use crate::filter::FilterError;

/// Bucket holding the serialized approximate filters.
pub const BLOOM_BUCKET: &str = "bloom";
/// Key of the file size filter inside [`BLOOM_BUCKET`].
pub const SIZE_FILTER_KEY: &str = "size";
/// Key of the CRC-32 filter inside [`BLOOM_BUCKET`].
pub const CRC_FILTER_KEY: &str = "crc";
/// Bucket mapping hex MD5 digests to stored values.
pub const DIGEST_BUCKET: &str = "md5";

/// Table layout of a databank.
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entries (
    bucket TEXT NOT NULL,
    key    TEXT NOT NULL,
    value  BLOB NOT NULL,
    PRIMARY KEY (bucket, key)
) WITHOUT ROWID;";

/// Errors raised by the index layer.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot open databank {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("databank has no '{key}' filter")]
    MissingFilter { key: &'static str },

    #[error("databank filter '{key}' is corrupt: {source}")]
    CorruptFilter {
        key: &'static str,
        #[source]
        source: FilterError,
    },

    #[error("databank query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

impl From<IndexError> for ScanError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Open { path, source } => ScanError::StoreUnavailable {
                path,
                reason: source.to_string(),
            },
            IndexError::MissingFilter { key } => ScanError::MissingIndex {
                key: key.to_string(),
            },
            IndexError::CorruptFilter { key, source } => ScanError::CorruptIndex {
                key: key.to_string(),
                reason: source.to_string(),
            },
            IndexError::Query(source) => ScanError::Lookup {
                reason: source.to_string(),
            },
        }
    }
}

/// A value stored under a digest: `code;name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Field before the separator.
    pub code: String,
    /// Field after the separator.
    pub name: String,
}

impl StoredEntry {
    /// Split a raw stored value on its first `;`.
    ///
    /// A value without separator is kept whole as the code.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        match text.split_once(';') {
            Some((code, name)) => Self {
                code: code.to_string(),
                name: name.to_string(),
            },
            None => {
                tracing::warn!(value = %text, "stored value has no ';' separator");
                Self {
                    code: text.into_owned(),
                    name: String::new(),
                }
            }
        }
    }
}

/// Read-only handle pinned to one snapshot of the databank.
pub struct ContentStore {
    conn: Connection,
    path: PathBuf,
}

impl ContentStore {
    /// Open the databank read-only and pin a read snapshot.
    ///
    /// The snapshot lasts until [`ContentStore::close`] or drop, so writers
    /// working on the file out-of-band never affect an open handle.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| IndexError::Open {
            path: path.clone(),
            source,
        };

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;

        conn.execute_batch("BEGIN DEFERRED").map_err(open_err)?;
        // A deferred transaction takes its snapshot on the first read.
        conn.query_row("SELECT count(*) FROM entries", [], |row| row.get::<_, i64>(0))
            .map_err(open_err)?;

        tracing::debug!(path = %path.display(), "databank opened read-only");
        Ok(Self { conn, path })
    }

    /// Path the store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch a raw value. A missing key is `Ok(None)`.
    pub fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM entries WHERE bucket = ?1 AND key = ?2")?;
        let value = stmt
            .query_row(params![bucket, key], |row| {
                Ok(match row.get_ref(0)? {
                    ValueRef::Blob(bytes) | ValueRef::Text(bytes) => bytes.to_vec(),
                    _ => Vec::new(),
                })
            })
            .optional()?;
        Ok(value)
    }

    /// Fetch and parse the entry stored for a hex digest.
    pub fn get_entry(&self, digest_hex: &str) -> Result<Option<StoredEntry>, IndexError> {
        Ok(self
            .get(DIGEST_BUCKET, digest_hex)?
            .map(|raw| StoredEntry::parse(&raw)))
    }

    /// Release the snapshot and close the connection.
    pub fn close(self) -> Result<(), IndexError> {
        self.conn.execute_batch("COMMIT")?;
        self.conn.close().map_err(|(_, e)| IndexError::Query(e))?;
        tracing::debug!(path = %self.path.display(), "databank closed");
        Ok(())
    }
}
