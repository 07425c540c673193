use std::collections::HashSet;

use crate::data::tree::TreeNode;

/// Whether `node` or anything below it is set locally.
pub fn has_set_descendant(node: &TreeNode) -> bool {
    node.is_set || node.children.iter().any(has_set_descendant)
}

/// Pre-order projection of `tree` for display.
///
/// A node is kept when `show_unset` is on, when it or a descendant is set,
/// or when it has changes; a dropped branch takes its subtree with it.
/// Children of a branch appear only when its path is in `expanded`.
pub fn flatten_tree<'a>(
    tree: &'a [TreeNode],
    show_unset: bool,
    expanded: &HashSet<String>,
) -> Vec<&'a TreeNode> {
    let mut out = Vec::new();
    walk(tree, show_unset, expanded, &mut out);
    out
}

fn walk<'a>(
    nodes: &'a [TreeNode],
    show_unset: bool,
    expanded: &HashSet<String>,
    out: &mut Vec<&'a TreeNode>,
) {
    for node in nodes {
        if !(show_unset || has_set_descendant(node) || node.has_changes) {
            continue;
        }
        out.push(node);
        if node.is_branch() && expanded.contains(&node.path) {
            walk(&node.children, show_unset, expanded, out);
        }
    }
}

/// Every path in `tree`.
pub fn all_paths(tree: &[TreeNode]) -> HashSet<String> {
    fn collect(nodes: &[TreeNode], paths: &mut HashSet<String>) {
        for node in nodes {
            paths.insert(node.path.clone());
            collect(&node.children, paths);
        }
    }

    let mut paths = HashSet::new();
    collect(tree, &mut paths);
    paths
}

/// All nodes, fully expanded and including unset ones.
pub fn searchable_nodes(tree: &[TreeNode]) -> Vec<&TreeNode> {
    flatten_tree(tree, true, &all_paths(tree))
}

/// Nodes whose key, path or description contains `query`, ignoring case.
/// A blank query matches nothing.
pub fn search_nodes<'a>(tree: &'a [TreeNode], query: &str) -> Vec<&'a TreeNode> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let query = query.to_lowercase();
    searchable_nodes(tree)
        .into_iter()
        .filter(|n| {
            n.key.to_lowercase().contains(&query)
                || n.path.to_lowercase().contains(&query)
                || n.schema
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&query))
        })
        .collect()
}

/// Navigation state over a tree: expansion, cursor and visibility toggles.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeViewState {
    expanded: HashSet<String>,
    cursor: usize,
    show_unset: bool,
    show_edits: bool,
}

impl Default for TreeViewState {
    fn default() -> Self {
        Self {
            expanded: HashSet::new(),
            cursor: 0,
            show_unset: false,
            show_edits: true,
        }
    }
}

impl TreeViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes currently on screen. Hiding edits drops every node with changes.
    pub fn visible_nodes<'a>(&self, tree: &'a [TreeNode]) -> Vec<&'a TreeNode> {
        let mut nodes = flatten_tree(tree, self.show_unset, &self.expanded);
        if !self.show_edits {
            nodes.retain(|n| !n.has_changes);
        }
        nodes
    }

    /// Cursor position clamped to the visible list.
    pub fn cursor(&self, tree: &[TreeNode]) -> usize {
        let len = self.visible_nodes(tree).len();
        self.cursor.min(len.saturating_sub(1))
    }

    pub fn focused<'a>(&self, tree: &'a [TreeNode]) -> Option<&'a TreeNode> {
        let nodes = self.visible_nodes(tree);
        let index = self.cursor.min(nodes.len().saturating_sub(1));
        nodes.get(index).copied()
    }

    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index;
    }

    pub fn move_cursor(&mut self, tree: &[TreeNode], delta: isize) {
        let len = self.visible_nodes(tree).len();
        let last = len.saturating_sub(1);
        let current = self.cursor.min(last);
        self.cursor = current.saturating_add_signed(delta).min(last);
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn expanded(&self) -> &HashSet<String> {
        &self.expanded
    }

    pub fn toggle_expand(&mut self, path: &str) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_string());
        }
    }

    pub fn expand_all(&mut self, tree: &[TreeNode]) {
        self.expanded = all_paths(tree);
    }

    pub fn show_unset(&self) -> bool {
        self.show_unset
    }

    pub fn show_edits(&self) -> bool {
        self.show_edits
    }

    pub fn toggle_show_unset(&mut self) {
        self.show_unset = !self.show_unset;
    }

    pub fn toggle_show_edits(&mut self) {
        self.show_edits = !self.show_edits;
    }
}
