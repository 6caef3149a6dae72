//! Text rendering of a loaded tree.

use std::fmt::Write;

use cfgtree_core::tree::Namespace;

/// One line per table and namespace, children indented under their parent.
pub fn render_summary(root: &Namespace) -> String {
    let mut out = String::new();
    render_node(root, 0, &mut out);
    let _ = writeln!(
        out,
        "{} tables, {} rows",
        root.table_count(),
        root.row_count()
    );
    out
}

fn render_node(node: &Namespace, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (name, table) in node.tables() {
        let _ = writeln!(
            out,
            "{indent}{name}  {} rows  [{} -> {}]",
            table.len(),
            table.key_type(),
            short_type_name(table.value_type())
        );
    }
    for (name, child) in node.namespaces() {
        let _ = writeln!(out, "{indent}{name}/");
        render_node(child, depth + 1, out);
    }
}

/// `serde_json::value::Value` -> `Value`.
fn short_type_name(full: &str) -> &str {
    match full.find('<') {
        Some(_) => full,
        None => full.rsplit("::").next().unwrap_or(full),
    }
}
