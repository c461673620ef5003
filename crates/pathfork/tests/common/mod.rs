//! Shared helpers for router integration tests.

use std::sync::Once;

use pathfork::Router;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary. Set `RUST_LOG`
/// (e.g. `pathfork=trace`) to see registration and lookup events.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Build a router from `(method, pattern, handler)` triples.
pub fn router(routes: &[(&str, &str, &'static str)]) -> Router<&'static str> {
    init_tracing();
    let mut router = Router::new();
    for (method, pattern, handler) in routes {
        if let Err(e) = router.add(method, pattern, *handler) {
            panic!("failed to add {method} {pattern}: {e}");
        }
    }
    router
}

/// Look up and flatten to `(first handler, params)`.
pub fn lookup(
    router: &Router<&'static str>,
    method: &str,
    path: &str,
) -> Option<(&'static str, Vec<String>)> {
    router
        .lookup(method, path)
        .map(|found| (*found.handler(), found.params().to_vec()))
}

/// Every ordering of `items`.
#[allow(dead_code)]
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first.clone());
            all.push(tail);
        }
    }
    all
}
