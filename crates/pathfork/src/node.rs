//! Trie node model.
//!
//! Nodes live in an arena owned by [`Trie`](crate::trie::Trie) and refer to
//! each other through [`NodeId`] handles, so a split can re-parent a node
//! without moving it.

use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;

use crate::dispatch::HandlerTable;

/// Stable handle to a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// The root node, prefix `/`.
pub(crate) const ROOT: NodeId = NodeId(0);

/// Node variants.
#[derive(Debug)]
pub(crate) enum NodeKind {
    /// Literal text; never empty except that the root holds `/`.
    Static { prefix: String },
    Parametric(Parametric),
    /// Terminal, matches the remaining path.
    Wildcard,
}

/// A parametric node and the sub-patterns that share it.
#[derive(Debug)]
pub(crate) struct Parametric {
    pub(crate) regex: Option<Arc<Regex>>,
    pub(crate) static_suffix: Option<String>,
    /// Template spans merged into this node, in registration order.
    pub(crate) sources: Vec<String>,
}

impl Parametric {
    /// Merge key: the regex source, `None` for an unconstrained segment.
    pub(crate) fn signature(&self) -> Option<&str> {
        self.regex.as_deref().map(Regex::as_str)
    }

    fn rank(&self) -> u8 {
        match (&self.regex, &self.static_suffix) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
        }
    }

    /// Whether `self` must come after `other` in a sibling list.
    ///
    /// Constrained nodes precede the unconstrained catch-all, suffix-bearing
    /// nodes precede suffix-less ones, and a suffix precedes any shorter
    /// suffix it ends with. Unrelated siblings keep registration order.
    pub(crate) fn sorts_after(&self, other: &Parametric) -> bool {
        let (rank, other_rank) = (self.rank(), other.rank());
        if rank != other_rank {
            return rank < other_rank;
        }
        match (&self.static_suffix, &other.static_suffix) {
            (Some(suffix), Some(other_suffix)) => {
                other_suffix.len() > suffix.len() && other_suffix.ends_with(suffix.as_str())
            }
            _ => false,
        }
    }
}

/// A trie node.
#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) kind: NodeKind,
    /// Static children keyed by the first character of their prefix.
    pub(crate) static_children: HashMap<char, NodeId>,
    /// Parametric children, most specific first.
    pub(crate) parametric_children: Vec<NodeId>,
    pub(crate) wildcard_child: Option<NodeId>,
    pub(crate) handlers: Option<HandlerTable<T>>,
}

impl<T> Node<T> {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            static_children: HashMap::new(),
            parametric_children: Vec::new(),
            wildcard_child: None,
            handlers: None,
        }
    }

    pub(crate) fn new_static(prefix: impl Into<String>) -> Self {
        Self::new(NodeKind::Static {
            prefix: prefix.into(),
        })
    }

    /// Static prefix, empty for other kinds.
    pub(crate) fn prefix(&self) -> &str {
        match &self.kind {
            NodeKind::Static { prefix } => prefix,
            _ => "",
        }
    }

    pub(crate) fn parametric(&self) -> Option<&Parametric> {
        match &self.kind {
            NodeKind::Parametric(param) => Some(param),
            _ => None,
        }
    }

    pub(crate) fn parametric_mut(&mut self) -> Option<&mut Parametric> {
        match &mut self.kind {
            NodeKind::Parametric(param) => Some(param),
            _ => None,
        }
    }
}
