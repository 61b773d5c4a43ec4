//! Folder tree structures for hierarchical display.
//!
//! A tree is derived from flat records on every read and never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node in a virtual folder tree.
///
/// `T` is the item attached to the tree: a `FileRecord` when rendering
/// stored attachments, a selection entry when previewing an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode<T> {
    /// Folder name. Empty for the root.
    pub name: String,
    /// Full virtual path with a trailing slash. Empty for the root.
    pub path: String,
    /// Files directly inside this folder, in insertion order.
    pub files: Vec<T>,
    /// Child folders keyed by name.
    pub folders: BTreeMap<String, FolderNode<T>>,
}

impl<T> FolderNode<T> {
    /// Create an empty node with the given name and path.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            files: Vec::new(),
            folders: BTreeMap::new(),
        }
    }

    /// Number of files in this node and all descendants.
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .folders
                .values()
                .map(FolderNode::file_count)
                .sum::<usize>()
    }

    /// Number of descendant folders.
    pub fn folder_count(&self) -> usize {
        self.folders.len()
            + self
                .folders
                .values()
                .map(FolderNode::folder_count)
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FolderNode<&'static str> {
        let mut root = FolderNode::new("", "");
        root.files.push("a.txt");
        let mut sub = FolderNode::new("sub", "sub/");
        sub.files.push("b.txt");
        let mut deep = FolderNode::new("deep", "sub/deep/");
        deep.files.push("c.txt");
        sub.folders.insert("deep".to_string(), deep);
        root.folders.insert("sub".to_string(), sub);
        root
    }

    #[test]
    fn test_counts() {
        let tree = sample();
        assert_eq!(tree.file_count(), 3);
        assert_eq!(tree.folder_count(), 2);
        assert_eq!(tree.folders["sub"].file_count(), 2);
        assert_eq!(FolderNode::<&str>::new("", "").folder_count(), 0);
    }
}
