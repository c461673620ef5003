use thiserror::Error;

/// Errors produced while registering a route.
///
/// Every variant is raised synchronously by [`Router::add`](crate::Router::add);
/// lookups never fail, they only miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern is the empty string.
    #[error("route pattern is empty")]
    Empty,

    /// The pattern does not start with `/` or `*`.
    #[error("route pattern must start with '/' or '*': {0}")]
    InvalidStart(String),

    /// A `{...}` constraint is missing its closing brace.
    #[error("unbalanced regex constraint brackets in \"{0}\"")]
    UnbalancedConstraint(String),

    /// A `*` appears somewhere other than the last character.
    #[error("wildcard '*' must be the last character of the route: {0}")]
    WildcardNotLast(String),

    /// An optional `/:name?` segment is followed by more pattern text.
    #[error("optional parameter must be the last segment of the route: {0}")]
    OptionalNotLast(String),

    /// The assembled parameter regex was rejected by the regex engine.
    #[error("invalid regex constraint in \"{pattern}\": {reason}")]
    InvalidConstraint { pattern: String, reason: String },
}
