//! Per-node method dispatch.

use std::collections::HashMap;
use std::sync::Arc;

/// Method key that answers any request method without an exact entry.
pub const ALL: &str = "ALL";

/// Maps parameter names to their position in the parameter stash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamIndex {
    positions: HashMap<String, usize>,
}

impl ParamIndex {
    /// Build from the ordered parameter names of a route. A repeated name
    /// resolves to its last position.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let positions = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.into(), index))
            .collect();
        Self { positions }
    }

    /// Position of `name` in the parameter stash.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A registered handler and the parameter layout of its route.
#[derive(Debug, Clone)]
pub struct Handler<T> {
    value: T,
    params: Arc<ParamIndex>,
}

impl<T> Handler<T> {
    pub(crate) fn new(value: T, params: Arc<ParamIndex>) -> Self {
        Self { value, params }
    }

    /// The registered handler value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Name-to-position map for this handler's route.
    pub fn param_index(&self) -> &ParamIndex {
        &self.params
    }
}

/// Which entry of a handler table answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSlot {
    /// The entry registered under the request method itself.
    Exact,
    /// The `ALL` entry.
    Fallback,
}

/// Method-to-handlers table held by a terminal node.
#[derive(Debug)]
pub(crate) struct HandlerTable<T> {
    methods: HashMap<String, Vec<Handler<T>>>,
}

impl<T> HandlerTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Append a handler; earlier registrations for the method are kept.
    pub(crate) fn push(&mut self, method: &str, handler: Handler<T>) {
        self.methods
            .entry(method.to_string())
            .or_default()
            .push(handler);
    }

    /// Handlers for `method`, falling back to `ALL`.
    pub(crate) fn resolve(&self, method: &str) -> Option<(MethodSlot, &[Handler<T>])> {
        if let Some(handlers) = self.methods.get(method) {
            return Some((MethodSlot::Exact, handlers));
        }
        self.methods
            .get(ALL)
            .map(|handlers| (MethodSlot::Fallback, handlers.as_slice()))
    }

    /// Handlers for a slot previously returned by [`resolve`](Self::resolve).
    pub(crate) fn get(&self, method: &str, slot: MethodSlot) -> Option<&[Handler<T>]> {
        let key = match slot {
            MethodSlot::Exact => method,
            MethodSlot::Fallback => ALL,
        };
        self.methods.get(key).map(Vec::as_slice)
    }

    /// Registered methods, sorted.
    pub(crate) fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}
