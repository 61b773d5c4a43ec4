//! Builds folder trees from flat `(folder path, item)` lists.

use std::collections::BTreeMap;

use attach_entity::file::FileRecord;
use attach_entity::folder::FolderNode;

/// Build a tree from items paired with their folder path.
///
/// Paths are split on `/` and empty segments are ignored, so `sub/deep/`,
/// `sub/deep` and `/sub//deep` land in the same folder. Items without a
/// folder path attach to the root. Files keep their input order within each
/// folder.
pub fn build_tree<T>(items: impl IntoIterator<Item = (String, T)>) -> FolderNode<T> {
    let entries = items
        .into_iter()
        .map(|(path, item)| {
            let mut segments: Vec<String> = path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            segments.reverse();
            (segments, item)
        })
        .collect();
    build_node(String::new(), String::new(), entries)
}

/// Group entries by their next segment and recurse.
///
/// Segments are stored reversed so the next one is popped off the end.
fn build_node<T>(name: String, path: String, entries: Vec<(Vec<String>, T)>) -> FolderNode<T> {
    let mut node = FolderNode::new(name, path);
    let mut groups: BTreeMap<String, Vec<(Vec<String>, T)>> = BTreeMap::new();

    for (mut segments, item) in entries {
        match segments.pop() {
            None => node.files.push(item),
            Some(first) => groups.entry(first).or_default().push((segments, item)),
        }
    }

    for (child_name, children) in groups {
        let child_path = format!("{}{child_name}/", node.path);
        let child = build_node(child_name.clone(), child_path, children);
        node.folders.insert(child_name, child);
    }
    node
}

/// Build the tree of an article's stored attachments.
pub fn tree_from_records(records: Vec<FileRecord>) -> FolderNode<FileRecord> {
    build_tree(
        records
            .into_iter()
            .map(|record| (record.virtual_path.clone(), record)),
    )
}

/// Hide the batch container folder `label` when rendering a tree.
///
/// Its files and folders move up to the root but keep their real paths, so
/// they stay addressable as archive scopes. A folder that would collide with
/// an existing root folder stays under the container, which then remains.
pub fn collapse_batch_folder<T>(mut tree: FolderNode<T>, label: &str) -> FolderNode<T> {
    if label.is_empty() {
        return tree;
    }
    let Some(mut container) = tree.folders.remove(label) else {
        return tree;
    };

    tree.files.append(&mut container.files);

    let mut colliding = BTreeMap::new();
    for (name, child) in std::mem::take(&mut container.folders) {
        if tree.folders.contains_key(&name) {
            colliding.insert(name, child);
        } else {
            tree.folders.insert(name, child);
        }
    }

    if !colliding.is_empty() {
        container.folders = colliding;
        tree.folders.insert(label.to_string(), container);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_of(relative_path: &str) -> String {
        match relative_path.rsplit_once('/') {
            Some((folder, _)) => folder.to_string(),
            None => String::new(),
        }
    }

    fn name_of(relative_path: &str) -> &str {
        relative_path.rsplit('/').next().unwrap_or(relative_path)
    }

    fn selection_tree(paths: &[&'static str]) -> FolderNode<&'static str> {
        build_tree(paths.iter().map(|p| (folder_of(p), name_of(p))))
    }

    fn flatten(node: &FolderNode<&'static str>, out: &mut Vec<String>) {
        out.extend(node.files.iter().map(|name| format!("{}{name}", node.path)));
        for child in node.folders.values() {
            flatten(child, out);
        }
    }

    #[test]
    fn test_files_reproduce_relative_paths() {
        let paths = [
            "a.txt",
            "sub/b.txt",
            "sub/deep/c.txt",
            "other/d.txt",
            "sub/e.txt",
            "Sub/f.txt",
            "sub/deep/deeper/g.txt",
        ];
        let tree = selection_tree(&paths);

        assert_eq!(tree.file_count(), paths.len());
        let mut rebuilt = Vec::new();
        flatten(&tree, &mut rebuilt);
        rebuilt.sort();
        let mut expected: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        expected.sort();
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_folders_merge_case_sensitively() {
        let tree = selection_tree(&["sub/a.txt", "sub/b.txt", "Sub/c.txt"]);
        assert_eq!(tree.folders.len(), 2);
        assert_eq!(tree.folders["sub"].files, vec!["a.txt", "b.txt"]);
        assert_eq!(tree.folders["Sub"].path, "Sub/");
    }

    #[test]
    fn test_empty_segments_are_ignored() {
        let tree = build_tree(vec![
            ("/sub//deep/".to_string(), 1),
            ("sub/deep".to_string(), 2),
            (String::new(), 3),
        ]);
        assert_eq!(tree.files, vec![3]);
        let deep = &tree.folders["sub"].folders["deep"];
        assert_eq!(deep.files, vec![1, 2]);
        assert_eq!(deep.path, "sub/deep/");
    }

    #[test]
    fn test_collapse_promotes_container_contents() {
        let tree = build_tree(vec![
            ("39dab4d8_f600/".to_string(), "a.txt"),
            ("39dab4d8_f600/sub/".to_string(), "b.txt"),
            ("39dab4d8_f600/sub/deep/".to_string(), "c.txt"),
        ]);
        let collapsed = collapse_batch_folder(tree, "39dab4d8_f600");

        assert_eq!(collapsed.files, vec!["a.txt"]);
        assert!(!collapsed.folders.contains_key("39dab4d8_f600"));
        let sub = &collapsed.folders["sub"];
        assert_eq!(sub.path, "39dab4d8_f600/sub/");
        assert_eq!(sub.folders["deep"].path, "39dab4d8_f600/sub/deep/");
        assert_eq!(collapsed.file_count(), 3);
    }

    #[test]
    fn test_collapse_keeps_colliding_folders_under_container() {
        let tree = build_tree(vec![
            ("docs/".to_string(), "root.txt"),
            ("lbl/docs/".to_string(), "nested.txt"),
            ("lbl/img/".to_string(), "pic.png"),
        ]);
        let collapsed = collapse_batch_folder(tree, "lbl");

        assert_eq!(collapsed.folders["docs"].files, vec!["root.txt"]);
        assert_eq!(collapsed.folders["img"].path, "lbl/img/");
        let container = &collapsed.folders["lbl"];
        assert_eq!(container.folders.len(), 1);
        assert_eq!(container.folders["docs"].files, vec!["nested.txt"]);
    }

    #[test]
    fn test_collapse_without_container_is_noop() {
        let tree = selection_tree(&["a.txt", "sub/b.txt"]);
        let collapsed = collapse_batch_folder(tree.clone(), "missing");
        assert_eq!(collapsed, tree);
    }
}
