//! Folder tree produced by the folder discovery scan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A directory in the discovered folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Absolute path of this folder, `/` for the tree root.
    #[serde(rename = "path")]
    pub full_path: String,
    /// Whether a games scan result exists for this folder.
    pub scanned: bool,
    /// Sub-folders keyed by their name.
    pub contents: BTreeMap<String, FolderNode>,
}

impl FolderNode {
    /// Create an empty, unscanned node.
    pub fn new(full_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            scanned: false,
            contents: BTreeMap::new(),
        }
    }

    /// Create the tree root (`/`).
    pub fn root() -> Self {
        Self::new("/")
    }

    /// Insert every component of `path` below this node, returning the deepest node.
    ///
    /// `on_create` is called once for each node that did not exist yet.
    pub fn insert_path<'a, I, F>(&mut self, components: I, mut on_create: F) -> &mut FolderNode
    where
        I: IntoIterator<Item = &'a str>,
        F: FnMut(&mut FolderNode),
    {
        let mut current = self;
        let mut full_path = String::new();
        for component in components {
            if component.is_empty() {
                continue;
            }
            full_path.push('/');
            full_path.push_str(component);
            current = current
                .contents
                .entry(component.to_string())
                .or_insert_with(|| {
                    let mut node = FolderNode::new(full_path.clone());
                    on_create(&mut node);
                    node
                });
        }
        current
    }

    /// Find a descendant by its path components.
    pub fn get<'a, I>(&self, components: I) -> Option<&FolderNode>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for component in components {
            if component.is_empty() {
                continue;
            }
            current = current.contents.get(component)?;
        }
        Some(current)
    }

    /// Total number of folders below this node.
    pub fn descendant_count(&self) -> usize {
        self.contents
            .values()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

impl Default for FolderNode {
    fn default() -> Self {
        Self::root()
    }
}
