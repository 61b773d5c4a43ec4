//! Virtual folder trees rebuilt from flat path lists.

pub mod builder;

pub use builder::{build_tree, collapse_batch_folder, tree_from_records};
