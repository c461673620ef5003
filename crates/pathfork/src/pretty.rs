//! Tree rendering for diagnostics.

use std::fmt;

use crate::node::{NodeId, NodeKind, ROOT};
use crate::router::Router;
use crate::trie::Trie;

impl<T> fmt::Display for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trie = self.trie();
        write!(f, "<root>")?;
        write_methods(f, trie, ROOT)?;
        writeln!(f)?;
        write_children(f, trie, ROOT, "")
    }
}

fn label<T>(trie: &Trie<T>, id: NodeId) -> String {
    match &trie.node(id).kind {
        NodeKind::Static { prefix } => prefix.clone(),
        NodeKind::Parametric(param) => param.sources.join("|"),
        NodeKind::Wildcard => "*".to_string(),
    }
}

fn write_methods<T>(f: &mut fmt::Formatter<'_>, trie: &Trie<T>, id: NodeId) -> fmt::Result {
    match &trie.node(id).handlers {
        Some(table) => write!(f, " [{}]", table.methods().join(", ")),
        None => Ok(()),
    }
}

fn write_children<T>(
    f: &mut fmt::Formatter<'_>,
    trie: &Trie<T>,
    id: NodeId,
    indent: &str,
) -> fmt::Result {
    let node = trie.node(id);

    let mut statics: Vec<NodeId> = node.static_children.values().copied().collect();
    statics.sort_by(|a, b| trie.node(*a).prefix().cmp(trie.node(*b).prefix()));

    let children: Vec<NodeId> = statics
        .into_iter()
        .chain(node.parametric_children.iter().copied())
        .chain(node.wildcard_child)
        .collect();

    for (i, &child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, extension) = if last { ("└─ ", "   ") } else { ("├─ ", "│  ") };

        write!(f, "{indent}{branch}{}", label(trie, child))?;
        write_methods(f, trie, child)?;
        writeln!(f)?;

        write_children(f, trie, child, &format!("{indent}{extension}"))?;
    }

    Ok(())
}
