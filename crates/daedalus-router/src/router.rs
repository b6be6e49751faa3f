//! Router facade over the radix tree.

use http::Method;

use crate::error::PatternError;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;
use crate::RouteMatch;

/// A radix tree router generic over the value stored per verb.
///
/// # Route Priority
///
/// 1. **Static segments** (`/users/me`)
/// 2. **Parameter segments** (`/users/:id`)
/// 3. **Wildcard segments** (`/files/*path`)
///
/// A failed static or parameter branch falls back to the next kind.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Inserts all verbs of `methods` under `path`.
    ///
    /// Verbs already registered at the same pattern are kept.
    pub fn insert(&mut self, path: &str, methods: MethodRouter<T>) -> Result<(), PatternError> {
        let added = methods.allowed_methods().len();
        self.root.insert(path, methods)?;
        self.route_count += added;
        Ok(())
    }

    /// Registers one verb at `path`, refusing to replace an existing one.
    ///
    /// ```rust
    /// use daedalus_router::{PatternError, Router};
    /// use http::Method;
    ///
    /// let mut router = Router::new();
    /// router.route(&Method::GET, "/hello/:name", 1).unwrap();
    /// let err = router.route(&Method::GET, "/hello/{name}", 2).unwrap_err();
    /// assert!(matches!(err, PatternError::Duplicate { .. }));
    /// ```
    pub fn route(&mut self, method: &Method, path: &str, value: T) -> Result<(), PatternError> {
        if self.contains(method, path) {
            return Err(PatternError::Duplicate {
                method: method.clone(),
                pattern: path.to_string(),
            });
        }
        self.insert(path, MethodRouter::new().method(method, value))
    }

    /// True when `method` is registered at exactly the pattern `path`.
    #[must_use]
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.root
            .find_pattern(path)
            .is_some_and(|methods| methods.contains(method))
    }

    /// Matches a request verb and path.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let (methods, params) = self.root.match_path(path)?;
        let value = methods.get_value(method)?;
        Some(RouteMatch::new(value, params))
    }

    /// Matches a path regardless of verb.
    ///
    /// Used to tell 404 from 405 and to fill the `Allow` header.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        self.root.match_path(path)
    }

    /// Number of (verb, pattern) registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_route_counts_verbs() {
        let mut router = Router::new();
        router
            .insert("/users", MethodRouter::new().get(1).post(2))
            .unwrap();
        router.route(&Method::DELETE, "/users/:id", 3).unwrap();
        assert_eq!(router.len(), 3);
        assert!(!router.is_empty());
    }

    #[test]
    fn test_same_path_other_verb_is_allowed() {
        let mut router = Router::new();
        router.route(&Method::GET, "/hello", "get").unwrap();
        router.route(&Method::POST, "/hello", "post").unwrap();

        assert_eq!(
            *router.match_route(&Method::POST, "/hello").unwrap().value,
            "post"
        );
    }

    #[test]
    fn test_method_mismatch_still_matches_path() {
        let mut router = Router::new();
        router.route(&Method::GET, "/only-get", ()).unwrap();

        assert!(router.match_route(&Method::PUT, "/only-get").is_none());
        let (methods, _) = router.match_path("/only-get").unwrap();
        assert_eq!(methods.allowed_methods(), vec![Method::GET]);
    }

    #[test]
    fn test_contains_is_pattern_exact() {
        let mut router = Router::new();
        router.route(&Method::GET, "/files/*path", ()).unwrap();
        assert!(router.contains(&Method::GET, "/files/*path"));
        assert!(!router.contains(&Method::GET, "/files/a.txt"));
        assert!(!router.contains(&Method::POST, "/files/*path"));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let mut router = Router::new();
        router.route(&Method::GET, "/api/v1/", "v1").unwrap();
        assert!(router.match_route(&Method::GET, "/api/v1").is_some());
    }

    proptest! {
        #[test]
        fn param_captures_any_segment(seg in "[A-Za-z0-9_.~-]{1,24}") {
            let mut router = Router::new();
            router.route(&Method::GET, "/users/:id/profile", ()).unwrap();
            let path = format!("/users/{seg}/profile");
            let m = router.match_route(&Method::GET, &path).unwrap();
            prop_assert_eq!(m.params.get("id"), Some(seg.as_str()));
        }
    }
}
