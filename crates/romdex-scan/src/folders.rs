//! Folder-tree discovery.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use romdex_core::{FolderNode, ScanError};

use crate::sink::games_output_path;
use crate::walker::{DirectoryWalker, WalkDirective};

/// Builds the tree of folders below a base path, marking the ones that
/// already have games scan results.
#[derive(Debug, Clone)]
pub struct FolderScanner {
    walker: DirectoryWalker,
    games_db_dir: PathBuf,
}

impl FolderScanner {
    pub fn new(games_db_dir: impl Into<PathBuf>) -> Self {
        Self {
            walker: DirectoryWalker::new(),
            games_db_dir: games_db_dir.into(),
        }
    }

    pub fn with_walker(mut self, walker: DirectoryWalker) -> Self {
        self.walker = walker;
        self
    }

    /// Walk `base` and return the tree rooted at `/`.
    ///
    /// Nodes are keyed by the absolute path components of each folder, so
    /// the base itself appears at its full depth. Folders below the base
    /// whose name starts with `.` or `_` are pruned. Without `recursive`
    /// only the base and its immediate sub-folders are listed.
    pub fn scan(&self, base: &Path, recursive: bool) -> Result<FolderNode, ScanError> {
        let base = std::path::absolute(base).map_err(|e| ScanError::io(base, e))?;
        let metadata = std::fs::metadata(&base).map_err(|e| ScanError::io(&base, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: base });
        }

        let mut root = FolderNode::root();
        self.walker.walk(&base, |entry| {
            if !entry.is_directory() {
                return Ok(WalkDirective::SkipFiles);
            }
            if entry.depth > 0 && is_hidden(&entry.file_name()) {
                return Ok(WalkDirective::SkipDir);
            }

            let components = normal_components(&entry.path);
            root.insert_path(components.iter().map(String::as_str), |node| {
                node.scanned = self.has_results(&node.full_path);
            });

            if !recursive && entry.depth > 0 {
                return Ok(WalkDirective::SkipDir);
            }
            Ok(WalkDirective::Continue)
        })?;

        info!(
            base = %base.display(),
            folders = root.descendant_count(),
            recursive,
            "folder scan finished"
        );
        Ok(root)
    }

    fn has_results(&self, folder: &str) -> bool {
        std::fs::metadata(games_output_path(&self.games_db_dir, Path::new(folder)))
            .is_ok_and(|m| m.is_file())
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
