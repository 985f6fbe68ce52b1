//! Zip container access without decompressing rejected members.
//!
//! Member names, declared sizes and CRC-32 values come from the central
//! directory. Payload bytes are only inflated by [`ArchiveReader::digest_entry`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use romdex_core::ScanError;
use romdex_index::{ContentDigest, digest_reader};

/// Central-directory metadata of one archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the central directory.
    pub index: usize,
    /// Name inside the archive, `/`-separated.
    pub name: String,
    /// Declared uncompressed size.
    pub size: u64,
    /// Declared CRC-32 of the uncompressed bytes.
    pub crc32: u32,
    pub is_dir: bool,
}

/// An open zip container.
pub struct ArchiveReader {
    archive: ZipArchive<BufReader<File>>,
    path: PathBuf,
}

impl ArchiveReader {
    /// Open a container and read its central directory.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(path, e))?;
        Ok(Self {
            archive,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Metadata of the member at `index`. Reads no payload.
    pub fn entry(&mut self, index: usize) -> Result<ArchiveEntry, ScanError> {
        let file = self
            .archive
            .by_index_raw(index)
            .map_err(|e| zip_error(&self.path, e))?;
        Ok(ArchiveEntry {
            index,
            name: file.name().to_string(),
            size: file.size(),
            crc32: file.crc32(),
            is_dir: file.is_dir(),
        })
    }

    /// Single-pass iterator over member metadata in directory order.
    pub fn entries(&mut self) -> Entries<'_> {
        Entries {
            reader: self,
            next: 0,
        }
    }

    /// Inflate a member and digest its bytes.
    ///
    /// The stored CRC-32 is verified as the member is read to its end, so a
    /// damaged member surfaces as an error rather than a wrong digest.
    pub fn digest_entry(&mut self, entry: &ArchiveEntry) -> Result<(ContentDigest, u64), ScanError> {
        let member_path = self.path.join(&entry.name);
        let mut file = self
            .archive
            .by_index(entry.index)
            .map_err(|e| zip_error(&member_path, e))?;
        digest_reader(&mut file).map_err(|e| ScanError::io(member_path, e))
    }
}

/// Iterator returned by [`ArchiveReader::entries`].
pub struct Entries<'a> {
    reader: &'a mut ArchiveReader,
    next: usize,
}

impl Iterator for Entries<'_> {
    type Item = Result<ArchiveEntry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.reader.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.reader.entry(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Lexically clean a `/`-separated member name.
///
/// Empty and `.` segments are dropped and `..` removes the preceding
/// segment. A `..` with nothing left to remove is dropped, so the result
/// never climbs out of the archive.
pub fn clean_member_name(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn zip_error(path: &Path, err: ZipError) -> ScanError {
    match err {
        ZipError::Io(source) => ScanError::io(path, source),
        other => ScanError::archive(path, other),
    }
}
