//! Compressed trie: insertion (split/merge) and backtracking lookup.

use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;

use crate::dispatch::{Handler, HandlerTable, MethodSlot, ParamIndex};
use crate::error::RouteError;
use crate::node::{Node, NodeId, NodeKind, Parametric, ROOT};
use crate::pattern::{CompiledRoute, ParamToken, Token};

/// Arena-backed routing trie shared by every method.
#[derive(Debug)]
pub(crate) struct Trie<T> {
    nodes: Vec<Node<T>>,
    /// Compiled parameter regexes keyed by source text.
    regexes: HashMap<String, Arc<Regex>>,
}

/// A successful traversal: the terminal node, the handler slot that
/// answered, and the raw parameter values in template order.
#[derive(Debug)]
pub(crate) struct Traversal<'p> {
    pub(crate) node: NodeId,
    pub(crate) slot: MethodSlot,
    pub(crate) params: Vec<&'p str>,
}

/// A deferred alternative on the backtracking stack.
#[derive(Debug, Clone, Copy)]
struct Deferred {
    node: NodeId,
    path_index: usize,
    param_count: usize,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self {
            nodes: vec![Node::new_static("/")],
            regexes: HashMap::new(),
        }
    }
}

impl<T> Trie<T> {
    pub(crate) fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: Node<T>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Handlers stored at `node` for a slot found by an earlier traversal.
    pub(crate) fn handlers(&self, node: NodeId, method: &str, slot: MethodSlot) -> &[Handler<T>] {
        self.nodes
            .get(node.0)
            .and_then(|node| node.handlers.as_ref())
            .and_then(|table| table.get(method, slot))
            .unwrap_or(&[])
    }

    /// Insert a compiled route and append `handler` under `method` at its
    /// terminal node.
    ///
    /// Every regex is compiled before the trie is touched, so a rejected
    /// constraint leaves the trie unchanged.
    pub(crate) fn insert(
        &mut self,
        method: &str,
        pattern: &str,
        route: &CompiledRoute,
        handler: T,
    ) -> Result<NodeId, RouteError> {
        let mut regexes = Vec::new();
        for token in &route.tokens {
            if let Token::Param(param) = token {
                regexes.push(self.compile_regex(pattern, param)?);
            }
        }
        let mut regexes = regexes.into_iter();

        let mut current = ROOT;
        for token in &route.tokens {
            current = match token {
                Token::Static(text) => self.static_child(current, text),
                Token::Param(param) => {
                    let regex = regexes.next().flatten();
                    self.parametric_child(current, regex, param)
                }
                Token::Wildcard => self.wildcard_child(current),
            };
        }

        let params = Arc::new(ParamIndex::from_names(route.params.iter().cloned()));
        self.node_mut(current)
            .handlers
            .get_or_insert_with(HandlerTable::new)
            .push(method, Handler::new(handler, params));

        Ok(current)
    }

    fn compile_regex(
        &mut self,
        pattern: &str,
        param: &ParamToken,
    ) -> Result<Option<Arc<Regex>>, RouteError> {
        let Some(source) = &param.regex else {
            return Ok(None);
        };
        if let Some(regex) = self.regexes.get(source) {
            return Ok(Some(Arc::clone(regex)));
        }

        let regex = Regex::new(source).map_err(|e| RouteError::InvalidConstraint {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let regex = Arc::new(regex);
        self.regexes.insert(source.clone(), Arc::clone(&regex));
        Ok(Some(regex))
    }

    /// Walk or create the static chain spelling `text` below `parent`,
    /// splitting existing prefixes where they diverge.
    fn static_child(&mut self, parent: NodeId, text: &str) -> NodeId {
        let mut parent = parent;
        let mut rest = text;

        loop {
            let Some(first) = rest.chars().next() else {
                return parent;
            };

            let Some(&child) = self.node(parent).static_children.get(&first) else {
                let id = self.push(Node::new_static(rest));
                self.node_mut(parent).static_children.insert(first, id);
                return id;
            };

            let (common, prefix_len) = {
                let prefix = self.node(child).prefix();
                (common_prefix_len(prefix, rest), prefix.len())
            };

            let next = if common < prefix_len {
                self.split(parent, child, common)
            } else {
                child
            };

            parent = next;
            rest = &rest[common..];
        }
    }

    /// Split `child` at byte `at`: a new node holding the common prefix
    /// takes its place under `parent`, and `child` keeps the remainder.
    fn split(&mut self, parent: NodeId, child: NodeId, at: usize) -> NodeId {
        let NodeKind::Static { prefix } = &mut self.node_mut(child).kind else {
            return child;
        };
        let tail = prefix.split_off(at);
        let head = std::mem::replace(prefix, tail);
        let tail_first = prefix.chars().next();

        tracing::trace!(
            prefix = %head,
            remainder = %self.node(child).prefix(),
            "Splitting static node"
        );

        let head_first = head.chars().next();
        let mut intermediate = Node::new_static(head);
        if let Some(first) = tail_first {
            intermediate.static_children.insert(first, child);
        }
        let id = self.push(intermediate);
        if let Some(first) = head_first {
            self.node_mut(parent).static_children.insert(first, id);
        }
        id
    }

    /// Reuse the sibling with the same regex signature or insert a new
    /// parametric node at its priority position.
    fn parametric_child(
        &mut self,
        parent: NodeId,
        regex: Option<Arc<Regex>>,
        token: &ParamToken,
    ) -> NodeId {
        let signature = regex.as_deref().map(Regex::as_str);
        let existing = self
            .node(parent)
            .parametric_children
            .iter()
            .copied()
            .find(|&id| {
                self.node(id)
                    .parametric()
                    .is_some_and(|param| param.signature() == signature)
            });

        if let Some(id) = existing {
            if let Some(param) = self.node_mut(id).parametric_mut() {
                if !param.sources.contains(&token.source) {
                    tracing::trace!(
                        source = %token.source,
                        merged_into = ?param.sources,
                        "Merging parametric node"
                    );
                    param.sources.push(token.source.clone());
                }
            }
            return id;
        }

        let candidate = Parametric {
            regex,
            static_suffix: token.static_suffix.clone(),
            sources: vec![token.source.clone()],
        };

        let position = self
            .node(parent)
            .parametric_children
            .iter()
            .position(|&id| {
                self.node(id)
                    .parametric()
                    .is_some_and(|sibling| sibling.sorts_after(&candidate))
            })
            .unwrap_or(self.node(parent).parametric_children.len());

        let id = self.push(Node::new(NodeKind::Parametric(candidate)));
        self.node_mut(parent)
            .parametric_children
            .insert(position, id);
        id
    }

    fn wildcard_child(&mut self, parent: NodeId) -> NodeId {
        if let Some(id) = self.node(parent).wildcard_child {
            return id;
        }
        let id = self.push(Node::new(NodeKind::Wildcard));
        self.node_mut(parent).wildcard_child = Some(id);
        id
    }

    /// Resolve `path` for `method`.
    ///
    /// Static children are preferred, then parametric children in priority
    /// order, then the wildcard. Alternatives not taken are pushed onto an
    /// explicit stack and retried from their divergence point when the
    /// chosen branch dead-ends.
    pub(crate) fn resolve<'p>(&self, method: &str, path: &'p str) -> Option<Traversal<'p>> {
        if !path.starts_with('/') {
            return None;
        }

        let mut current = ROOT;
        let mut path_index = self.node(ROOT).prefix().len();
        let mut params: Vec<&'p str> = Vec::new();
        let mut stack: Vec<Deferred> = Vec::new();

        loop {
            if path_index == path.len() {
                if let Some(table) = &self.node(current).handlers {
                    if let Some((slot, _)) = table.resolve(method) {
                        return Some(Traversal {
                            node: current,
                            slot,
                            params,
                        });
                    }
                }
            }

            let mut next = self.next_node(current, path, path_index, &mut stack, params.len());

            current = loop {
                let node = match next.take() {
                    Some(node) => node,
                    None => {
                        let deferred = stack.pop()?;
                        path_index = deferred.path_index;
                        params.truncate(deferred.param_count);
                        deferred.node
                    }
                };

                if self.enter(node, path, &mut path_index, &mut params) {
                    break node;
                }
            };
        }
    }

    /// Pick the preferred child of `id` at `path_index` and defer the rest.
    fn next_node(
        &self,
        id: NodeId,
        path: &str,
        path_index: usize,
        stack: &mut Vec<Deferred>,
        param_count: usize,
    ) -> Option<NodeId> {
        let node = self.node(id);
        let parametric = &node.parametric_children;

        let (chosen, deferred_params) = match self.static_match(node, path, path_index) {
            Some(child) => (child, &parametric[..]),
            None => match parametric.split_first() {
                Some((&first, rest)) => (first, rest),
                None => return node.wildcard_child,
            },
        };

        let defer = |node| Deferred {
            node,
            path_index,
            param_count,
        };
        if let Some(wildcard) = node.wildcard_child {
            stack.push(defer(wildcard));
        }
        // Reverse so the most specific alternative pops first.
        stack.extend(deferred_params.iter().rev().copied().map(defer));

        Some(chosen)
    }

    fn static_match(&self, node: &Node<T>, path: &str, path_index: usize) -> Option<NodeId> {
        let rest = path.get(path_index..)?;
        let first = rest.chars().next()?;
        let child = *node.static_children.get(&first)?;
        rest.starts_with(self.node(child).prefix()).then_some(child)
    }

    /// Consume the part of `path` that node `id` matches. Returns false when
    /// a parametric regex rejects the segment.
    fn enter<'p>(
        &self,
        id: NodeId,
        path: &'p str,
        path_index: &mut usize,
        params: &mut Vec<&'p str>,
    ) -> bool {
        match &self.node(id).kind {
            NodeKind::Static { prefix } => {
                *path_index += prefix.len();
                true
            }
            NodeKind::Wildcard => {
                params.push(&path[*path_index..]);
                *path_index = path.len();
                true
            }
            NodeKind::Parametric(param) => {
                let end = path[*path_index..]
                    .find('/')
                    .map_or(path.len(), |offset| *path_index + offset);
                let segment = &path[*path_index..end];

                match &param.regex {
                    None => params.push(segment),
                    Some(regex) => match regex.captures(segment) {
                        Ok(Some(captures)) => params.extend(
                            (1..captures.len())
                                .map(|group| captures.get(group).map_or("", |m| m.as_str())),
                        ),
                        Ok(None) => return false,
                        Err(e) => {
                            tracing::trace!(
                                regex = %regex.as_str(),
                                error = %e,
                                "Parameter regex aborted, treating as no match"
                            );
                            return false;
                        }
                    },
                }

                *path_index = end;
                true
            }
        }
    }
}

/// Length in bytes of the longest common prefix, on character boundaries.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((index, ch), _)| index + ch.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{compile, Compiled};

    fn insert(trie: &mut Trie<&'static str>, method: &str, pattern: &str, handler: &'static str) {
        match compile(pattern).unwrap() {
            Compiled::Route(route) => {
                trie.insert(method, pattern, &route, handler).unwrap();
            }
            Compiled::Optional { .. } => panic!("optional patterns are expanded by the router"),
        }
    }

    fn resolve<'p>(trie: &Trie<&'static str>, method: &str, path: &'p str) -> Option<(&'static str, Vec<&'p str>)> {
        trie.resolve(method, path).map(|t| {
            let handler = *trie.handlers(t.node, method, t.slot)[0].value();
            (handler, t.params)
        })
    }

    fn static_child_prefixes(trie: &Trie<&'static str>, id: NodeId) -> Vec<String> {
        let mut prefixes: Vec<String> = trie
            .node(id)
            .static_children
            .values()
            .map(|&child| trie.node(child).prefix().to_string())
            .collect();
        prefixes.sort();
        prefixes
    }

    #[test]
    fn common_prefix_on_char_boundaries() {
        assert_eq!(common_prefix_len("static", "status"), 4);
        assert_eq!(common_prefix_len("users", "users/me"), 5);
        assert_eq!(common_prefix_len("café", "cafè"), 3);
        assert_eq!(common_prefix_len("a", "b"), 0);
    }

    #[test]
    fn split_on_divergence() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/static", "static");
        insert(&mut trie, "GET", "/status", "status");

        assert_eq!(static_child_prefixes(&trie, ROOT), vec!["stat"]);
        let stat = trie.node(ROOT).static_children[&'s'];
        assert_eq!(static_child_prefixes(&trie, stat), vec!["ic", "us"]);

        assert_eq!(resolve(&trie, "GET", "/static").unwrap().0, "static");
        assert_eq!(resolve(&trie, "GET", "/status").unwrap().0, "status");
        assert!(resolve(&trie, "GET", "/stat").is_none());
    }

    #[test]
    fn split_when_new_text_is_a_prefix() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/users/me", "me");
        insert(&mut trie, "GET", "/users", "users");

        assert_eq!(static_child_prefixes(&trie, ROOT), vec!["users"]);
        assert_eq!(resolve(&trie, "GET", "/users").unwrap().0, "users");
        assert_eq!(resolve(&trie, "GET", "/users/me").unwrap().0, "me");
    }

    #[test]
    fn split_keeps_multibyte_characters_whole() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/café", "e-acute");
        insert(&mut trie, "GET", "/cafè", "e-grave");

        assert_eq!(resolve(&trie, "GET", "/café").unwrap().0, "e-acute");
        assert_eq!(resolve(&trie, "GET", "/cafè").unwrap().0, "e-grave");
    }

    #[test]
    fn parametric_nodes_merge_by_signature() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/users/:id", "get");
        insert(&mut trie, "DELETE", "/users/:userId", "delete");

        let users = trie.node(ROOT).static_children[&'u'];
        let children = &trie.node(users).parametric_children;
        assert_eq!(children.len(), 1);
        let param = trie.node(children[0]).parametric().unwrap();
        assert_eq!(param.sources, vec![":id", ":userId"]);

        assert_eq!(resolve(&trie, "DELETE", "/users/7").unwrap(), ("delete", vec!["7"]));
    }

    #[test]
    fn regexes_are_compiled_once_per_signature() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/a/:id{\\d+}", "a");
        insert(&mut trie, "GET", "/b/:id{\\d+}", "b");

        assert_eq!(trie.regexes.len(), 1);
    }

    #[test]
    fn handlers_accumulate_at_terminal_node() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/x", "first");
        insert(&mut trie, "GET", "/x", "second");

        let t = trie.resolve("GET", "/x").unwrap();
        let values: Vec<_> = trie
            .handlers(t.node, "GET", t.slot)
            .iter()
            .map(|h| *h.value())
            .collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn backtracks_from_static_to_parametric() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/users/me/settings", "settings");
        insert(&mut trie, "GET", "/users/:id/profile", "profile");

        assert_eq!(
            resolve(&trie, "GET", "/users/me/profile").unwrap(),
            ("profile", vec!["me"])
        );
    }

    #[test]
    fn failed_regex_falls_through_to_sibling() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/bt/:a{\\d+}-:b{\\d+}", "numbers");
        insert(&mut trie, "GET", "/bt/:text", "text");

        assert_eq!(resolve(&trie, "GET", "/bt/12-34").unwrap(), ("numbers", vec!["12", "34"]));
        assert_eq!(resolve(&trie, "GET", "/bt/12-abc").unwrap(), ("text", vec!["12-abc"]));
    }

    #[test]
    fn failed_regex_at_end_of_path_is_not_a_match() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/posts/:id{\\d+}", "post");

        assert!(resolve(&trie, "GET", "/posts/").is_none());
        assert!(resolve(&trie, "GET", "/posts/abc").is_none());
    }

    #[test]
    fn backtracking_restores_params() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/:a/:b/end", "three");
        insert(&mut trie, "GET", "/:a/*", "rest");

        assert_eq!(
            resolve(&trie, "GET", "/x/y/end").unwrap(),
            ("three", vec!["x", "y"])
        );
        assert_eq!(
            resolve(&trie, "GET", "/x/y/other").unwrap(),
            ("rest", vec!["x", "y/other"])
        );
    }

    #[test]
    fn wildcard_child_of_parametric_node() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "/v:version*", "versioned");

        assert_eq!(
            resolve(&trie, "GET", "/v2").unwrap(),
            ("versioned", vec!["2", ""])
        );
    }

    #[test]
    fn method_miss_backtracks_to_other_branch() {
        let mut trie = Trie::default();
        insert(&mut trie, "POST", "/users/me", "create-me");
        insert(&mut trie, "GET", "/users/:id", "get-user");

        assert_eq!(resolve(&trie, "GET", "/users/me").unwrap(), ("get-user", vec!["me"]));
        assert_eq!(resolve(&trie, "POST", "/users/me").unwrap().0, "create-me");
    }

    #[test]
    fn path_without_leading_slash_misses() {
        let mut trie = Trie::default();
        insert(&mut trie, "GET", "*", "any");

        assert!(resolve(&trie, "GET", "").is_none());
        assert!(resolve(&trie, "GET", "users").is_none());
        assert_eq!(resolve(&trie, "GET", "/users").unwrap(), ("any", vec!["users"]));
    }
}
