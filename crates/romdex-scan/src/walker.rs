//! Depth-first directory walker with per-entry directives.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use romdex_core::ScanError;

/// Kind of a walked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// Symlinks (when not followed), sockets, devices.
    Other,
}

/// One entry produced by the walker.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Distance from the walk root, which has depth 0.
    pub depth: usize,
}

impl WalkEntry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_regular_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Final path component as UTF-8, lossily.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What the walker should do after visiting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDirective {
    /// Keep going.
    Continue,
    /// Do not descend into this directory. On a non-directory entry, skip
    /// the rest of the directory it lives in.
    SkipDir,
    /// Stop visiting non-directory entries of the directory this entry lives
    /// in. Sub-directories are still visited.
    SkipFiles,
}

/// Sequential depth-first walker.
///
/// Entries within a directory are visited in file-name order, so repeated
/// walks over an unchanged tree visit the same sequence.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    follow_links: bool,
}

impl DirectoryWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links; their targets are reported with the target's kind.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Walk `root`, calling `visit` for the root and every entry below it.
    ///
    /// The first filesystem error, or the first error returned by `visit`,
    /// aborts the walk and is returned.
    pub fn walk<F>(&self, root: &Path, mut visit: F) -> Result<(), ScanError>
    where
        F: FnMut(&WalkEntry) -> Result<WalkDirective, ScanError>,
    {
        let mut iter = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter();

        // Directories whose remaining files were suppressed by `SkipFiles`.
        let mut files_skipped_in: HashSet<PathBuf> = HashSet::new();

        while let Some(next) = iter.next() {
            let entry = next.map_err(|err| walk_error(root, err))?;
            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            if kind != EntryKind::Directory
                && entry
                    .path()
                    .parent()
                    .is_some_and(|p| files_skipped_in.contains(p))
            {
                continue;
            }

            let depth = entry.depth();
            let walk_entry = WalkEntry {
                path: entry.into_path(),
                kind,
                depth,
            };

            match visit(&walk_entry)? {
                WalkDirective::Continue => {}
                WalkDirective::SkipDir => iter.skip_current_dir(),
                WalkDirective::SkipFiles => {
                    if let Some(parent) = walk_entry.path.parent() {
                        files_skipped_in.insert(parent.to_path_buf());
                    }
                }
            }
        }

        Ok(())
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> ScanError {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(io) => ScanError::io(path, io),
        None => ScanError::Io {
            path,
            source: std::io::Error::other("filesystem loop detected"),
        },
    }
}
