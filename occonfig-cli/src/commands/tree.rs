use std::collections::HashSet;

use colored::Colorize;
use occonfig::{
    AppData,
    data::{
        flatten::{TreeViewState, has_set_descendant, search_nodes},
        tree::{Change, TreeNode},
    },
};
use serde_json::Value;

use super::Context;

/// How `tree` lays out its output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Include keys that are not set.
    pub all: bool,
    /// Open every branch instead of only those holding set values.
    pub expand: bool,
    /// List the keys matching this text instead of the tree.
    pub search: Option<String>,
}

/// Print the tree of the requested scope.
pub fn run(ctx: &Context, raw_schema: Value, options: &TreeOptions) -> anyhow::Result<String> {
    let app = AppData::load(&ctx.locations, ctx.request, Some(raw_schema))?;
    let tree = app.tree();

    let header = format!(
        "{} config: {}",
        app.active_scope(),
        app.current().file_path.display()
    );
    let mut lines = vec![header.bold().to_string()];

    if let Some(query) = &options.search {
        let matches = search_nodes(&tree, query);
        if matches.is_empty() {
            lines.push(format!("No keys match \"{query}\""));
        }
        lines.extend(matches.into_iter().map(render_match));
        return Ok(lines.join("\n"));
    }

    let view = view_state(&tree, options);
    lines.extend(
        view.visible_nodes(&tree)
            .into_iter()
            .map(|node| render_row(node, view.is_expanded(&node.path))),
    );
    Ok(lines.join("\n"))
}

fn view_state(tree: &[TreeNode], options: &TreeOptions) -> TreeViewState {
    let mut view = TreeViewState::new();
    if options.all {
        view.toggle_show_unset();
    }
    if options.expand {
        view.expand_all(tree);
    } else {
        for path in set_branches(tree) {
            view.toggle_expand(&path);
        }
    }
    view
}

fn set_branches(tree: &[TreeNode]) -> HashSet<String> {
    fn collect(nodes: &[TreeNode], out: &mut HashSet<String>) {
        for node in nodes.iter().filter(|n| n.is_branch() && has_set_descendant(n)) {
            out.insert(node.path.clone());
            collect(&node.children, out);
        }
    }

    let mut out = HashSet::new();
    collect(tree, &mut out);
    out
}

/// One line: indent, marker, key and, for leaves, the effective value.
///
/// Markers: `+` added, `~` edited, `-` deleted, `*` set, `^` inherited.
pub fn render_row(node: &TreeNode, expanded: bool) -> String {
    let marker = match node.change {
        Change::Added => "+".green(),
        Change::Edited => "~".yellow(),
        Change::Deleted => "-".red(),
        Change::Unchanged if node.is_set => "*".normal(),
        Change::Unchanged if node.inherited_value.is_some() => "^".cyan(),
        Change::Unchanged => " ".normal(),
    };

    let mut line = format!("{}{marker} ", "  ".repeat(node.depth));
    if node.is_branch() {
        let arrow = if expanded { "v" } else { ">" };
        line.push_str(&format!("{arrow} {}", node.key));
    } else {
        line.push_str(&node.key);
        if let Some(value) = &node.effective_value {
            line.push_str(&format!(" = {value}"));
        }
    }

    if let Some(scope) = node.inherited_from {
        line.push_str(&format!(" ({scope})").dimmed().to_string());
    }
    if node.deprecated {
        line.push_str(&" (deprecated)".yellow().to_string());
    }
    if node.unknown {
        line.push_str(&" (unknown)".dimmed().to_string());
    }
    line
}

/// One search hit: full path, value for leaves, and the description.
fn render_match(node: &TreeNode) -> String {
    let mut line = node.path.clone();
    if !node.is_branch() {
        if let Some(value) = &node.effective_value {
            line.push_str(&format!(" = {value}"));
        }
    }
    if let Some(description) = &node.schema.description {
        line.push_str(&format!("  {}", description.dimmed()));
    }
    line
}
