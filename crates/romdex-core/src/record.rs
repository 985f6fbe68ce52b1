//! Per-file scan results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result emitted for every candidate file, matched or not.
///
/// Serializes as a five element JSON array in field order, which is the
/// line format of the per-folder results file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[String; 5]", into = "[String; 5]")]
pub struct MatchRecord {
    /// Folder of the file relative to the scan base, always starting with `/`.
    pub folder: String,
    /// File name, or `<archive name>/<entry name>` for archive members.
    pub file: String,
    /// Second field of the stored value (the descriptive name).
    pub name: String,
    /// First field of the stored value (the short code).
    pub code: String,
    /// Lowercase hex MD5 of the content, empty when no record was found.
    pub digest: String,
}

impl MatchRecord {
    /// A record for a candidate that matched nothing in the index.
    pub fn unmatched(folder: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            file: file.into(),
            name: String::new(),
            code: String::new(),
            digest: String::new(),
        }
    }

    /// A record for a candidate whose digest was found in the index.
    pub fn matched(
        folder: impl Into<String>,
        file: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            file: file.into(),
            name: name.into(),
            code: code.into(),
            digest: digest.into(),
        }
    }

    /// Whether the index produced an entry for this file.
    pub fn is_match(&self) -> bool {
        !self.digest.is_empty()
    }
}

impl From<MatchRecord> for [String; 5] {
    fn from(record: MatchRecord) -> Self {
        [
            record.folder,
            record.file,
            record.name,
            record.code,
            record.digest,
        ]
    }
}

impl From<[String; 5]> for MatchRecord {
    fn from([folder, file, name, code, digest]: [String; 5]) -> Self {
        Self {
            folder,
            file,
            name,
            code,
            digest,
        }
    }
}

/// Kind of tree scan holding the scan gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanKind {
    /// Game identification over a ROM folder.
    Games,
    /// Core and arcade definition discovery.
    Cores,
    /// Folder-tree discovery.
    Folders,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Games => write!(f, "games"),
            Self::Cores => write!(f, "cores"),
            Self::Folders => write!(f, "folders"),
        }
    }
}
