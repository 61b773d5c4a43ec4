//! Folder domain entities.

pub mod tree;

pub use tree::FolderNode;
