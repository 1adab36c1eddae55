use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use super::PathTrie;
use crate::http::ParamVec;
use crate::middleware::{Handler, Middleware};

/// Middlewares and handler registered for one `(method, pattern)` pair.
#[derive(Clone)]
pub struct Route {
    pub middlewares: Vec<Arc<dyn Middleware>>,
    pub handler: Arc<dyn Handler>,
}

/// Route table: a trie for path matching plus a map from
/// `METHOD::normalised_pattern` to the registered route.
#[derive(Default)]
pub struct Router {
    trie: PathTrie,
    routes: HashMap<String, Route>,
}

impl Router {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a route. Registering the same `(method, pattern)` twice
    /// replaces the earlier entry.
    pub fn register(&mut self, method: Method, pattern: &str, route: Route) {
        self.trie.insert(pattern);
        let key = route_key(&method, pattern);
        let replaced = self.routes.insert(key, route).is_some();
        info!(%method, pattern, replaced, "route registered");
    }

    /// Look up the route for a request, returning the captured path
    /// parameters alongside it. `None` means 404: either no pattern
    /// matched the path or none was registered for this method.
    pub fn find(&self, method: &Method, path: &str) -> Option<(ParamVec, &Route)> {
        let (params, normalised) = match self.trie.find(path) {
            Some(m) => m,
            None => {
                debug!(%method, path, "no pattern matched");
                return None;
            }
        };
        match self.routes.get(&route_key(method, &normalised)) {
            Some(route) => {
                debug!(%method, path, pattern = %normalised, "route matched");
                Some((params, route))
            }
            None => {
                debug!(%method, path, pattern = %normalised, "pattern has no route for this method");
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn route_key(method: &Method, pattern: &str) -> String {
    format!("{method}::{pattern}")
}
