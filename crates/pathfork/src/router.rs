use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::dispatch::{Handler, MethodSlot};
use crate::error::RouteError;
use crate::node::NodeId;
use crate::path::{decode_param, normalize_path};
use crate::pattern::{compile, Compiled};
use crate::trie::Trie;

/// The routing table. Maps (method, path) pairs to registered handlers.
///
/// Routes are added with [`add`](Self::add) during startup and resolved
/// with [`lookup`](Self::lookup) afterwards. `lookup` takes `&self`, so a
/// finished router can be shared between threads as-is.
#[derive(Debug)]
pub struct Router<T> {
    trie: Trie<T>,
    config: RouterConfig,
    /// Fully literal routes, answered without walking the trie.
    static_routes: HashMap<String, NodeId>,
}

/// Positional parameter values of a match, shared cheaply between clones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Arc<[String]>);

impl Params {
    /// Whether both values share the same allocation.
    pub fn ptr_eq(&self, other: &Params) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Params {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Params {
    fn from(values: Vec<String>) -> Self {
        Self(values.into())
    }
}

/// An owned lookup result that can be stored and turned back into a
/// [`Match`] with [`Router::to_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    node: NodeId,
    /// The request method this result answers.
    method: String,
    slot: MethodSlot,
    params: Params,
}

impl Resolved {
    /// Whether the `ALL` entry answered rather than the request method.
    pub fn is_fallback(&self) -> bool {
        self.slot == MethodSlot::Fallback
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// A successful lookup. Always holds at least one handler.
#[derive(Debug)]
pub struct Match<'r, T> {
    first: &'r Handler<T>,
    handlers: &'r [Handler<T>],
    params: Params,
}

impl<T> Clone for Match<'_, T> {
    fn clone(&self) -> Self {
        Self {
            first: self.first,
            handlers: self.handlers,
            params: self.params.clone(),
        }
    }
}

impl<'r, T> Match<'r, T> {
    fn new(handlers: &'r [Handler<T>], params: Params) -> Option<Self> {
        let first = handlers.first()?;
        Some(Self {
            first,
            handlers,
            params,
        })
    }

    /// All handlers registered for the route and method, in registration
    /// order.
    pub fn handlers(&self) -> &'r [Handler<T>] {
        self.handlers
    }

    /// The first registered handler.
    pub fn handler(&self) -> &'r T {
        self.first.value()
    }

    /// Parameter values in template order.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Look up a parameter value by name through the first handler's
    /// parameter map. The wildcard is named `*`.
    pub fn param(&self, name: &str) -> Option<&str> {
        let index = self.first.param_index().get(name)?;
        self.params.get(index).map(String::as_str)
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::with_config(RouterConfig::default())
    }
}

impl<T> Router<T> {
    /// Create an empty router with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty router.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            trie: Trie::default(),
            config,
            static_routes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register `handler` for `method` on `pattern`.
    ///
    /// Handlers registered for the same pattern and method accumulate in
    /// registration order. `ALL` registers a fallback for every method.
    pub fn add(&mut self, method: &str, pattern: &str, handler: T) -> Result<(), RouteError>
    where
        T: Clone,
    {
        let pattern = normalize_path(pattern, &self.config);

        match compile(&pattern)? {
            Compiled::Optional { present, absent } => {
                tracing::debug!(
                    method = %method,
                    pattern = %pattern,
                    present = %present,
                    absent = %absent,
                    "Expanding optional parameter"
                );
                self.add(method, &present, handler.clone())?;
                self.add(method, &absent, handler)
            }
            Compiled::Route(route) => {
                let node = self.trie.insert(method, &pattern, &route, handler)?;
                if let Some(literal) = route.literal_path() {
                    self.static_routes.insert(literal, node);
                }
                tracing::debug!(
                    method = %method,
                    pattern = %pattern,
                    params = route.params.len(),
                    "Registered route"
                );
                Ok(())
            }
        }
    }

    /// Look up a request path and method.
    pub fn lookup(&self, method: &str, path: &str) -> Option<Match<'_, T>> {
        let resolved = self.resolve(method, path)?;
        self.to_match(&resolved)
    }

    /// Look up a request path only among fully literal routes.
    ///
    /// Misses when the literal route has no handler for `method`, even if
    /// a parametric route would match.
    pub fn lookup_static(&self, method: &str, path: &str) -> Option<Match<'_, T>> {
        let path = normalize_path(path, &self.config);
        let resolved = self.resolve_static(method, &path)?;
        self.to_match(&resolved)
    }

    /// Resolve a request into an owned result.
    pub fn resolve(&self, method: &str, path: &str) -> Option<Resolved> {
        let path = normalize_path(path, &self.config);

        if let Some(resolved) = self.resolve_static(method, &path) {
            return Some(resolved);
        }

        let Some(traversal) = self.trie.resolve(method, &path) else {
            tracing::trace!(method = %method, path = %path, "No route matched");
            return None;
        };

        let params: Vec<String> = if self.config.decode_params {
            traversal.params.into_iter().map(decode_param).collect()
        } else {
            traversal.params.into_iter().map(str::to_string).collect()
        };

        Some(Resolved {
            node: traversal.node,
            method: method.to_string(),
            slot: traversal.slot,
            params: params.into(),
        })
    }

    fn resolve_static(&self, method: &str, path: &str) -> Option<Resolved> {
        let node = *self.static_routes.get(path)?;
        let (slot, _) = self.trie.node(node).handlers.as_ref()?.resolve(method)?;
        Some(Resolved {
            node,
            method: method.to_string(),
            slot,
            params: Params::default(),
        })
    }

    /// Turn a result from [`resolve`](Self::resolve) back into a
    /// [`Match`]. Returns `None` for a result that this router did not
    /// produce.
    pub fn to_match(&self, resolved: &Resolved) -> Option<Match<'_, T>> {
        let handlers = self
            .trie
            .handlers(resolved.node, &resolved.method, resolved.slot);
        Match::new(handlers, resolved.params.clone())
    }

    pub(crate) fn trie(&self) -> &Trie<T> {
        &self.trie
    }
}
