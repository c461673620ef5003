//! Compressed-trie HTTP route matcher.
//!
//! Route templates (`/users/:id`, `/posts/:id{\d+}`, `/at/:hour-:minute`,
//! `/files/*`, `/items/:id?`) compile into a single trie shared by every
//! method. Lookups prefer static over parametric over wildcard children and
//! backtrack when a preferred branch dead-ends, returning the handlers
//! registered for the method (or the `ALL` fallback) and the captured
//! parameter values.
//!
//! ```
//! use pathfork::Router;
//!
//! let mut router = Router::new();
//! router.add("GET", "/users/:id", "get_user").unwrap();
//! router.add("GET", "/users/me", "get_me").unwrap();
//!
//! let found = router.lookup("GET", "/users/42").unwrap();
//! assert_eq!(*found.handler(), "get_user");
//! assert_eq!(found.param("id"), Some("42"));
//!
//! assert_eq!(*router.lookup("GET", "/users/me").unwrap().handler(), "get_me");
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
mod node;
pub mod path;
pub mod pattern;
mod pretty;
pub mod router;
mod trie;

pub use config::RouterConfig;
pub use dispatch::{Handler, MethodSlot, ParamIndex, ALL};
pub use error::RouteError;
pub use node::NodeId;
pub use path::normalize_path;
pub use pattern::{compile, to_regex};
pub use router::{Match, Params, Resolved, Router};
